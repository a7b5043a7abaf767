//! VT byte-stream decoder
//!
//! Turns a byte stream into typed [`Sequence`] events. Decoding is split in
//! two layers:
//!
//! ```text
//! Read ──► Decoder (UTF-8) ──char──► Parser (VT500 states) ──► Sequence queue
//! ```
//!
//! The [`Parser`] is a pure state machine; the [`Decoder`] owns the reader
//! and yields events through `Iterator`. Every stream ends with exactly one
//! [`Sequence::Eof`].

use std::collections::VecDeque;
use std::io::{self, Read};

const READ_CHUNK: usize = 4096;
const MAX_PARAM_BYTES: usize = 256;
const MAX_PARAMS: usize = 32;
const MAX_OSC_LEN: usize = 64 * 1024;

const CAN: char = '\x18';
const SUB: char = '\x1a';
const ESC: char = '\x1b';
const BEL: char = '\x07';
const DEL: char = '\x7f';

/// A decoded event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sequence {
    /// Printable character
    Print(char),
    /// C0 control code
    Control(char),
    /// Escape sequence: ESC intermediates final
    Esc { intermediates: Vec<u8>, final_byte: u8 },
    /// Control sequence. Private markers (`?`, `>`, `<`, `=`) are reported as
    /// intermediates.
    Csi { intermediates: Vec<u8>, params: Vec<u16>, final_byte: u8 },
    /// Operating system command payload
    Osc(String),
    /// Start of a device control string
    DcsStart { intermediates: Vec<u8>, params: Vec<u16>, final_byte: u8 },
    /// One character of device control string data
    DcsData(char),
    /// End of a device control string
    DcsEnd,
    /// Malformed or unsupported input
    Unrecognized(String),
    /// End of input
    Eof,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum State {
    #[default]
    Ground,
    Escape,
    EscapeIntermediate,
    CsiEntry,
    CsiParam,
    CsiIntermediate,
    CsiIgnore,
    OscString,
    DcsEntry,
    DcsParam,
    DcsIntermediate,
    DcsPassthrough,
    DcsIgnore,
    SosPmApc,
}

impl State {
    fn is_string(self) -> bool {
        matches!(
            self,
            State::OscString
                | State::DcsEntry
                | State::DcsParam
                | State::DcsIntermediate
                | State::DcsPassthrough
                | State::DcsIgnore
                | State::SosPmApc
        )
    }
}

/// VT500-style parser state machine
#[derive(Default)]
pub struct Parser {
    state: State,
    intermediates: Vec<u8>,
    params: Vec<u8>,
    osc: String,
    /// A string was just closed by ESC; a following `\` completes ST.
    terminated: bool,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one character, pushing any completed events to `out`
    pub fn advance(&mut self, c: char, out: &mut VecDeque<Sequence>) {
        if c == ESC {
            let was_string = self.state.is_string();
            self.leave_string(out);
            self.clear();
            self.terminated = was_string;
            self.state = State::Escape;
            return;
        }

        if c == CAN || c == SUB {
            match self.state {
                // Aborted strings produce nothing
                State::OscString => self.osc.clear(),
                _ => self.leave_string(out),
            }
            self.clear();
            self.state = State::Ground;
            out.push_back(Sequence::Control(c));
            return;
        }

        if ('\u{80}'..='\u{9f}').contains(&c) {
            self.c1(c, out);
            return;
        }

        match self.state {
            State::Ground => self.ground(c, out),
            State::Escape => self.escape(c, out),
            State::EscapeIntermediate => self.escape_intermediate(c, out),
            State::CsiEntry => self.csi_entry(c, out),
            State::CsiParam => self.csi_param(c, out),
            State::CsiIntermediate => self.csi_intermediate(c, out),
            State::CsiIgnore => self.csi_ignore(c, out),
            State::OscString => self.osc_string(c, out),
            State::DcsEntry | State::DcsParam | State::DcsIntermediate => self.dcs_header(c, out),
            State::DcsPassthrough => {
                if c != DEL {
                    out.push_back(Sequence::DcsData(c));
                }
            }
            State::DcsIgnore | State::SosPmApc => {}
        }
    }

    /// Run exit actions for the current state at end of input
    pub fn finish(&mut self, out: &mut VecDeque<Sequence>) {
        self.leave_string(out);
        self.clear();
        self.state = State::Ground;
    }

    fn clear(&mut self) {
        self.intermediates.clear();
        self.params.clear();
        self.osc.clear();
        self.terminated = false;
    }

    /// Exit action of the string states
    fn leave_string(&mut self, out: &mut VecDeque<Sequence>) {
        match self.state {
            State::OscString => out.push_back(Sequence::Osc(std::mem::take(&mut self.osc))),
            State::DcsPassthrough => out.push_back(Sequence::DcsEnd),
            _ => {}
        }
    }

    /// 8-bit C1 controls
    fn c1(&mut self, c: char, out: &mut VecDeque<Sequence>) {
        self.leave_string(out);
        self.clear();
        self.state = match c {
            '\u{90}' => State::DcsEntry,
            '\u{9b}' => State::CsiEntry,
            '\u{9d}' => State::OscString,
            '\u{98}' | '\u{9e}' | '\u{9f}' => State::SosPmApc,
            '\u{9c}' => State::Ground,
            _ => {
                // Same as the 7-bit ESC Fe form
                out.push_back(Sequence::Esc {
                    intermediates: Vec::new(),
                    final_byte: (c as u32 - 0x40) as u8,
                });
                State::Ground
            }
        };
    }

    fn ground(&mut self, c: char, out: &mut VecDeque<Sequence>) {
        match c {
            '\0'..='\x1f' => out.push_back(Sequence::Control(c)),
            DEL => {}
            _ => out.push_back(Sequence::Print(c)),
        }
    }

    fn escape(&mut self, c: char, out: &mut VecDeque<Sequence>) {
        let terminated = std::mem::take(&mut self.terminated);
        match c {
            '\0'..='\x1f' => out.push_back(Sequence::Control(c)),
            '\x20'..='\x2f' => {
                self.intermediates.push(c as u8);
                self.state = State::EscapeIntermediate;
            }
            '[' => self.state = State::CsiEntry,
            ']' => self.state = State::OscString,
            'P' => self.state = State::DcsEntry,
            'X' | '^' | '_' => self.state = State::SosPmApc,
            '\\' if terminated => self.state = State::Ground,
            '\x30'..='\x7e' => {
                out.push_back(Sequence::Esc {
                    intermediates: Vec::new(),
                    final_byte: c as u8,
                });
                self.state = State::Ground;
            }
            DEL => {}
            _ => self.unrecognized(format!("ESC {:?}", c), out),
        }
    }

    fn escape_intermediate(&mut self, c: char, out: &mut VecDeque<Sequence>) {
        match c {
            '\0'..='\x1f' => out.push_back(Sequence::Control(c)),
            '\x20'..='\x2f' => self.collect(c),
            '\x30'..='\x7e' => {
                out.push_back(Sequence::Esc {
                    intermediates: std::mem::take(&mut self.intermediates),
                    final_byte: c as u8,
                });
                self.state = State::Ground;
            }
            DEL => {}
            _ => self.unrecognized(format!("ESC {:?} {:?}", self.intermediates, c), out),
        }
    }

    fn csi_entry(&mut self, c: char, out: &mut VecDeque<Sequence>) {
        match c {
            '\0'..='\x1f' => out.push_back(Sequence::Control(c)),
            '0'..='9' | ':' | ';' => {
                self.param(c);
                self.state = State::CsiParam;
            }
            '<'..='?' => {
                self.collect(c);
                self.state = State::CsiParam;
            }
            '\x20'..='\x2f' => {
                self.collect(c);
                self.state = State::CsiIntermediate;
            }
            '\x40'..='\x7e' => self.csi_dispatch(c, out),
            DEL => {}
            _ => self.unrecognized(format!("CSI {:?}", c), out),
        }
    }

    fn csi_param(&mut self, c: char, out: &mut VecDeque<Sequence>) {
        match c {
            '\0'..='\x1f' => out.push_back(Sequence::Control(c)),
            '0'..='9' | ':' | ';' => self.param(c),
            '<'..='?' => self.state = State::CsiIgnore,
            '\x20'..='\x2f' => {
                self.collect(c);
                self.state = State::CsiIntermediate;
            }
            '\x40'..='\x7e' => self.csi_dispatch(c, out),
            DEL => {}
            _ => self.unrecognized(format!("CSI {:?}", c), out),
        }
    }

    fn csi_intermediate(&mut self, c: char, out: &mut VecDeque<Sequence>) {
        match c {
            '\0'..='\x1f' => out.push_back(Sequence::Control(c)),
            '\x20'..='\x2f' => self.collect(c),
            '\x30'..='\x3f' => self.state = State::CsiIgnore,
            '\x40'..='\x7e' => self.csi_dispatch(c, out),
            DEL => {}
            _ => self.unrecognized(format!("CSI {:?}", c), out),
        }
    }

    fn csi_ignore(&mut self, c: char, out: &mut VecDeque<Sequence>) {
        match c {
            '\0'..='\x1f' => out.push_back(Sequence::Control(c)),
            '\x40'..='\x7e' => {
                let raw = String::from_utf8_lossy(&self.params).into_owned();
                self.unrecognized(format!("CSI {} {}", raw, c), out);
            }
            _ => {}
        }
    }

    fn osc_string(&mut self, c: char, out: &mut VecDeque<Sequence>) {
        match c {
            BEL => {
                out.push_back(Sequence::Osc(std::mem::take(&mut self.osc)));
                self.state = State::Ground;
            }
            '\0'..='\x1f' | DEL => {}
            _ => {
                if self.osc.len() < MAX_OSC_LEN {
                    self.osc.push(c);
                }
            }
        }
    }

    fn dcs_header(&mut self, c: char, out: &mut VecDeque<Sequence>) {
        match (self.state, c) {
            (_, '\0'..='\x1f') | (_, DEL) => {}
            (State::DcsEntry | State::DcsParam, '0'..='9' | ':' | ';') => {
                self.param(c);
                self.state = State::DcsParam;
            }
            (State::DcsEntry, '<'..='?') => {
                self.collect(c);
                self.state = State::DcsParam;
            }
            (_, '\x20'..='\x2f') => {
                self.collect(c);
                self.state = State::DcsIntermediate;
            }
            (_, '\x30'..='\x3f') => self.state = State::DcsIgnore,
            (_, '\x40'..='\x7e') => {
                out.push_back(Sequence::DcsStart {
                    intermediates: std::mem::take(&mut self.intermediates),
                    params: parse_params(&self.params),
                    final_byte: c as u8,
                });
                self.params.clear();
                self.state = State::DcsPassthrough;
            }
            _ => self.state = State::DcsIgnore,
        }
    }

    fn csi_dispatch(&mut self, c: char, out: &mut VecDeque<Sequence>) {
        out.push_back(Sequence::Csi {
            intermediates: std::mem::take(&mut self.intermediates),
            params: parse_params(&self.params),
            final_byte: c as u8,
        });
        self.params.clear();
        self.state = State::Ground;
    }

    fn unrecognized(&mut self, what: String, out: &mut VecDeque<Sequence>) {
        out.push_back(Sequence::Unrecognized(what));
        self.clear();
        self.state = State::Ground;
    }

    fn collect(&mut self, c: char) {
        if self.intermediates.len() < 4 {
            self.intermediates.push(c as u8);
        }
    }

    fn param(&mut self, c: char) {
        if self.params.len() < MAX_PARAM_BYTES {
            self.params.push(c as u8);
        }
    }
}

/// Split a raw parameter string into integers
///
/// Fields are `;`-separated; an empty field is 0 and an empty string yields
/// no parameters. `:` sub-parameter groups are flattened, except that a
/// 6-part group (`38:2:CS:R:G:B`) drops its color-space id and a 2-part group
/// keeps only its first element.
fn parse_params(raw: &[u8]) -> Vec<u16> {
    if raw.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    for field in raw.split(|&b| b == b';') {
        let parts: Vec<u16> = field.split(|&b| b == b':').map(parse_number).collect();
        match parts.len() {
            2 => out.push(parts[0]),
            6 => {
                out.extend_from_slice(&parts[..2]);
                out.extend_from_slice(&parts[3..]);
            }
            _ => out.extend_from_slice(&parts),
        }
    }
    out.truncate(MAX_PARAMS);
    out
}

fn parse_number(digits: &[u8]) -> u16 {
    digits.iter().fold(0u16, |acc, &d| {
        acc.saturating_mul(10).saturating_add((d - b'0') as u16)
    })
}

/// Pull-based decoder over a byte source
pub struct Decoder<R> {
    reader: R,
    buf: Vec<u8>,
    start: usize,
    end: usize,
    eof: bool,
    parser: Parser,
    queue: VecDeque<Sequence>,
    finished: bool,
}

impl<R: Read> Decoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: vec![0; READ_CHUNK],
            start: 0,
            end: 0,
            eof: false,
            parser: Parser::new(),
            queue: VecDeque::new(),
            finished: false,
        }
    }

    /// Make at least `want` bytes available unless input ends first
    fn fill(&mut self, want: usize) -> bool {
        while self.end - self.start < want {
            if self.eof {
                return false;
            }
            if self.start > 0 {
                self.buf.copy_within(self.start..self.end, 0);
                self.end -= self.start;
                self.start = 0;
            }
            match self.reader.read(&mut self.buf[self.end..]) {
                Ok(0) => self.eof = true,
                Ok(n) => self.end += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::debug!("Input stream error: {}", e);
                    self.eof = true;
                }
            }
        }
        true
    }

    /// Next code point. Bytes that do not start a valid UTF-8 sequence are
    /// passed through as the code point of the same value.
    fn next_char(&mut self) -> Option<char> {
        if !self.fill(1) {
            return None;
        }
        let lead = self.buf[self.start];
        let len = match lead {
            0x00..=0x7f => 1,
            0xc2..=0xdf => 2,
            0xe0..=0xef => 3,
            0xf0..=0xf4 => 4,
            _ => 1,
        };
        if len > 1 {
            self.fill(len);
            let avail = &self.buf[self.start..self.end.min(self.start + len)];
            if let Ok(s) = std::str::from_utf8(avail) {
                if let Some(c) = s.chars().next() {
                    self.start += len;
                    return Some(c);
                }
            }
        }
        self.start += 1;
        Some(lead as char)
    }
}

impl<R: Read> Iterator for Decoder<R> {
    type Item = Sequence;

    fn next(&mut self) -> Option<Sequence> {
        loop {
            if let Some(seq) = self.queue.pop_front() {
                return Some(seq);
            }
            if self.finished {
                return None;
            }
            match self.next_char() {
                Some(c) => self.parser.advance(c, &mut self.queue),
                None => {
                    self.parser.finish(&mut self.queue);
                    self.queue.push_back(Sequence::Eof);
                    self.finished = true;
                }
            }
        }
    }
}
