//! Sequence dispatch
//!
//! Maps decoded [`Sequence`]s onto [`Terminal`] operations. Anything not
//! handled here is logged at debug level and dropped.

use std::sync::Arc;

use super::charset::Charset;
use super::decoder::Sequence;
use super::osc::{self, OscCommand};
use super::state::{CursorShape, Modes, Response, TermEvent, Terminal};

/// Parameter `i`, with 0 or missing meaning `default`
fn arg(params: &[u16], i: usize, default: u16) -> u16 {
    match params.get(i) {
        Some(&0) | None => default,
        Some(&v) => v,
    }
}

impl Terminal {
    /// Apply one decoded event
    pub fn apply(&mut self, seq: &Sequence) {
        match seq {
            Sequence::Print(c) => self.print(*c),
            Sequence::Control(c) => self.execute(*c),
            Sequence::Esc {
                intermediates,
                final_byte,
            } => self.esc_dispatch(intermediates, *final_byte),
            Sequence::Csi {
                intermediates,
                params,
                final_byte,
            } => self.csi_dispatch(intermediates, params, *final_byte),
            Sequence::Osc(payload) => self.osc_dispatch(payload),
            Sequence::DcsStart { final_byte, .. } => {
                tracing::debug!("Ignoring DCS {}", *final_byte as char);
            }
            Sequence::DcsData(_) | Sequence::DcsEnd | Sequence::Eof => {}
            Sequence::Unrecognized(what) => tracing::debug!("Unrecognized sequence: {}", what),
        }
    }

    fn execute(&mut self, c: char) {
        if c != '\x07' {
            self.mark_dirty();
        }
        match c {
            '\x07' => self.emit(TermEvent::Bell),
            '\x08' => self.backspace(),
            '\x09' => self.horizontal_tab(1),
            '\x0a' | '\x0b' | '\x0c' => self.linefeed(),
            '\x0d' => self.carriage_return(),
            '\x0e' => self.charsets.invoke(1),
            '\x0f' => self.charsets.invoke(0),
            _ => tracing::trace!("Ignoring C0 {:#04x}", c as u32),
        }
    }

    fn esc_dispatch(&mut self, intermediates: &[u8], final_byte: u8) {
        match (intermediates, final_byte) {
            ([], b'7') => self.save_cursor(),
            ([], b'8') => self.restore_cursor(),
            ([], b'D') => self.index(),
            ([], b'E') => self.next_line(),
            ([], b'H') => self.set_tab_stop(),
            ([], b'M') => self.reverse_index(),
            ([], b'N') => self.charsets.single_shift(2),
            ([], b'O') => self.charsets.single_shift(3),
            ([], b'c') => self.full_reset(),
            ([], b'=') => self.modes.insert(Modes::KEYPAD_APP),
            ([], b'>') => self.modes.remove(Modes::KEYPAD_APP),
            ([], b'\\') => {}
            ([b'#'], b'8') => self.screen_alignment(),
            ([slot @ (b'(' | b')' | b'*' | b'+')], _) => match Charset::from_designator(final_byte) {
                Some(charset) => self.charsets.designate((slot - b'(') as usize, charset),
                None => tracing::debug!("Unknown charset: {}", final_byte as char),
            },
            _ => tracing::debug!(
                "Unknown ESC: {:?} {}",
                String::from_utf8_lossy(intermediates),
                final_byte as char
            ),
        }
    }

    fn csi_dispatch(&mut self, intermediates: &[u8], params: &[u16], final_byte: u8) {
        self.mark_dirty();
        match (intermediates, final_byte) {
            ([], b'@') => self.insert_chars(arg(params, 0, 1)),
            ([], b'A') => self.cursor_up(arg(params, 0, 1)),
            ([], b'B') | ([], b'e') => self.cursor_down(arg(params, 0, 1)),
            ([], b'C') | ([], b'a') => self.cursor_forward(arg(params, 0, 1)),
            ([], b'D') => self.cursor_backward(arg(params, 0, 1)),
            ([], b'E') => {
                self.cursor_down(arg(params, 0, 1));
                self.carriage_return();
            }
            ([], b'F') => {
                self.cursor_up(arg(params, 0, 1));
                self.carriage_return();
            }
            ([], b'G') | ([], b'`') => self.set_column(arg(params, 0, 1) - 1),
            ([], b'H') | ([], b'f') => {
                self.cursor_position(arg(params, 0, 1) - 1, arg(params, 1, 1) - 1)
            }
            ([], b'I') => self.horizontal_tab(arg(params, 0, 1)),
            ([], b'J') | ([b'?'], b'J') => self.erase_in_display(params.first().copied().unwrap_or(0)),
            ([], b'K') | ([b'?'], b'K') => self.erase_in_line(params.first().copied().unwrap_or(0)),
            ([], b'L') => self.insert_lines(arg(params, 0, 1)),
            ([], b'M') => self.delete_lines(arg(params, 0, 1)),
            ([], b'P') => self.delete_chars(arg(params, 0, 1)),
            ([], b'S') => self.scroll_up(arg(params, 0, 1)),
            ([], b'T') => self.scroll_down(arg(params, 0, 1)),
            ([], b'X') => self.erase_chars(arg(params, 0, 1)),
            ([], b'Z') => self.backward_tab(arg(params, 0, 1)),
            ([], b'b') => self.repeat_last(arg(params, 0, 1)),
            ([], b'c') => {
                if params.first().copied().unwrap_or(0) == 0 {
                    let answer = self.options.answerback.clone();
                    self.respond(Response::DeviceAttributes(answer));
                }
            }
            ([b'>'], b'c') => self.respond(Response::SecondaryDeviceAttributes),
            ([], b'd') => self.set_row(arg(params, 0, 1) - 1),
            ([], b'g') => self.clear_tab_stop(params.first().copied().unwrap_or(0)),
            ([], b'h') | ([], b'l') => {
                for &mode in params {
                    self.set_mode(mode, final_byte == b'h');
                }
            }
            ([b'?'], b'h') | ([b'?'], b'l') => {
                for &mode in params {
                    self.set_private_mode(mode, final_byte == b'h');
                }
            }
            ([], b'm') => self.cursor.style.apply_sgr(params),
            ([], b'n') => match params.first().copied().unwrap_or(0) {
                5 => self.respond(Response::StatusOk),
                6 => {
                    let row = self.report_row() + 1;
                    let col = self.cursor.col + 1;
                    self.respond(Response::CursorPosition(row, col));
                }
                n => tracing::debug!("Unknown DSR: {}", n),
            },
            ([], b'r') => {
                let top = arg(params, 0, 1) - 1;
                let bottom = arg(params, 1, self.rows()) - 1;
                self.set_scroll_region(top, bottom);
            }
            ([], b's') => self.save_cursor(),
            ([], b'u') => self.restore_cursor(),
            ([b' '], b'q') => {
                self.cursor.shape = CursorShape::from_decscusr(params.first().copied().unwrap_or(0));
            }
            _ => tracing::debug!(
                "Unknown CSI: {:?} {:?} {}",
                String::from_utf8_lossy(intermediates),
                params,
                final_byte as char
            ),
        }
    }

    fn osc_dispatch(&mut self, payload: &str) {
        match osc::parse(payload) {
            OscCommand::SetTitle(title) => self.set_title(title),
            OscCommand::Hyperlink(link) => {
                if self.options.hyperlinks {
                    self.cursor.style.link = link.map(Arc::new);
                }
            }
            OscCommand::Unknown(selector) => tracing::debug!("Unknown OSC: {}", selector),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::term::decoder::Decoder;
    use crate::core::term::style::{AttrFlags, Color};

    fn feed(term: &mut Terminal, input: &[u8]) {
        for seq in Decoder::new(input) {
            term.apply(&seq);
        }
    }

    fn pos(term: &Terminal) -> (u16, u16) {
        (term.cursor().row, term.cursor().col)
    }

    #[test]
    fn test_cursor_movement() {
        let mut term = Terminal::new(80, 24);
        feed(&mut term, b"\x1b[10;20H");
        assert_eq!(pos(&term), (9, 19));
        feed(&mut term, b"\x1b[5A\x1b[3D");
        assert_eq!(pos(&term), (4, 16));
        feed(&mut term, b"\x1b[H\x1b[100B\x1b[999C");
        assert_eq!(pos(&term), (23, 79));
        feed(&mut term, b"\x1b[G\x1b[3d");
        assert_eq!(pos(&term), (2, 0));
    }

    #[test]
    fn test_sgr_applies_to_printed_cells() {
        let mut term = Terminal::new(10, 1);
        feed(&mut term, b"\x1b[1;38;2;1;2;3mA\x1b[0mB");
        let cells = &term.screen().rows[0].cells;
        assert!(cells[0].style.flags.contains(AttrFlags::BOLD));
        assert_eq!(cells[0].style.fg, Color::Rgb(1, 2, 3));
        assert_eq!(cells[1].style.fg, Color::Unset);
    }

    #[test]
    fn test_rgb_sgr_round_trip() {
        let color = Color::from_packed(0xa0_b1_c2);
        let mut term = Terminal::new(1, 1);
        feed(&mut term, color.to_sgr(false).as_bytes());
        assert_eq!(term.style().fg, color);
    }

    #[test]
    fn test_device_queries() {
        let mut term = Terminal::new(10, 5);
        feed(&mut term, b"\x1b[3;4H\x1b[6n\x1b[5n\x1b[c\x1b[>c");
        let replies: Vec<Vec<u8>> = term.take_responses().iter().map(Response::to_bytes).collect();
        assert_eq!(
            replies,
            vec![
                b"\x1b[3;4R".to_vec(),
                b"\x1b[0n".to_vec(),
                b"\x1b[?62;22c".to_vec(),
                b"\x1b[>1;10;0c".to_vec(),
            ]
        );
    }

    #[test]
    fn test_title_and_bell_events() {
        let mut term = Terminal::new(10, 1);
        feed(&mut term, b"\x1b]0;hello\x07\x07\x1b]2;hello\x1b\\");
        assert_eq!(term.title(), "hello");
        assert_eq!(
            term.take_events(),
            vec![TermEvent::TitleChanged("hello".into()), TermEvent::Bell]
        );
    }

    #[test]
    fn test_hyperlink_cells() {
        let mut term = Terminal::new(10, 1);
        feed(&mut term, b"\x1b]8;id=a;http://x\x1b\\ab\x1b]8;;\x1b\\c");
        let cells = &term.screen().rows[0].cells;
        let link = cells[0].style.link.as_deref().map(|l| (l.url.as_str(), l.id.as_str()));
        assert_eq!(link, Some(("http://x", "a")));
        assert!(cells[1].style.link.is_some());
        assert!(cells[2].style.link.is_none());
    }

    #[test]
    fn test_line_drawing_charset() {
        let mut term = Terminal::new(4, 1);
        feed(&mut term, b"\x1b(0lqk\x1b(Bq");
        assert_eq!(term.text(), "┌─┐q");
    }

    #[test]
    fn test_scroll_region_sequence() {
        let mut term = Terminal::new(1, 4);
        feed(&mut term, b"a\r\nb\r\nc\r\nd\x1b[2;3r\x1b[3H\n");
        assert_eq!(term.text(), "a\nc\n \nd");
        feed(&mut term, b"\x1b[r");
        assert_eq!((term.margin_top, term.margin_bottom), (0, 3));
    }

    #[test]
    fn test_reverse_index_scrolls_region_at_top_margin() {
        let mut term = Terminal::new(3, 3);
        feed(&mut term, b"a\r\nb\x1b[2;3r\x1b[2H\x1bM");
        assert_eq!(term.text(), "a  \n   \nb  ");
        assert_eq!(pos(&term), (1, 0));
    }

    #[test]
    fn test_erase_display_with_scrollback() {
        let mut term = Terminal::new(3, 2);
        feed(&mut term, b"a\r\nb\r\nc\r\nd");
        assert_eq!(term.scrollback().len(), 2);

        feed(&mut term, b"\x1b[3J");
        assert_eq!(term.text(), "   \n   ");
        assert_eq!(term.scrollback().len(), 0);
        assert_eq!(pos(&term), (1, 1));
    }

    #[test]
    fn test_insert_delete_chars_fill_with_current_style() {
        let mut term = Terminal::new(4, 1);
        feed(&mut term, b"ab\r\x1b[44m\x1b[2@");
        assert_eq!(term.text(), "  ab");
        let cells = &term.screen().rows[0].cells;
        assert_eq!(cells[0].style.bg, Color::Normal(4));
        assert_eq!(cells[1].style.bg, Color::Normal(4));
        assert_eq!(cells[2].style.bg, Color::Unset);

        let mut term = Terminal::new(4, 1);
        feed(&mut term, b"abcd\x1b[2G\x1b[41m\x1b[P");
        assert_eq!(term.text(), "acd ");
        assert_eq!(term.screen().rows[0].cells[3].style.bg, Color::Normal(1));
    }

    #[test]
    fn test_save_restore_cursor_mode() {
        let mut term = Terminal::new(10, 5);
        feed(&mut term, b"\x1b[2;3H\x1b[?1048h\x1b[5;9H");
        assert_eq!(pos(&term), (4, 8));
        feed(&mut term, b"\x1b[?1048l");
        assert_eq!(pos(&term), (1, 2));
        assert!(!term.is_alternate());
    }

    #[test]
    fn test_scroll_up_down_sequences() {
        let mut term = Terminal::new(1, 3);
        feed(&mut term, b"a\r\nb\r\nc\x1b[S");
        assert_eq!(term.text(), "b\nc\n ");
        assert_eq!(term.scrollback().len(), 1);

        feed(&mut term, b"\x1b[2T");
        assert_eq!(term.text(), " \n \nb");
        assert_eq!(pos(&term), (2, 0));
    }

    #[test]
    fn test_alt_screen_sequence() {
        let mut term = Terminal::new(4, 2);
        feed(&mut term, b"ab\x1b[?1049hxy\x1b[?1049l");
        assert_eq!(term.text(), "ab  \n    ");
        assert_eq!(pos(&term), (0, 2));
    }

    #[test]
    fn test_repeat_and_erase_chars() {
        let mut term = Terminal::new(6, 1);
        feed(&mut term, b"x\x1b[4b\x1b[1G\x1b[2X");
        assert_eq!(term.text(), "  xxx ");
    }

    #[test]
    fn test_decscusr_and_visibility() {
        let mut term = Terminal::new(2, 1);
        feed(&mut term, b"\x1b[5 q\x1b[?25l");
        assert_eq!(term.cursor().shape, CursorShape::BlinkingBar);
        assert!(!term.cursor().visible);
    }

    #[test]
    fn test_unknown_sequences_are_ignored() {
        let mut term = Terminal::new(3, 1);
        feed(&mut term, b"\x1b[?9999h\x1b[1;2y\x1b]777;x\x07\x1bP1q#0\x1b\\ok");
        assert_eq!(term.text(), "ok ");
    }
}
