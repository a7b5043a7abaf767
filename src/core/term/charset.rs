//! Character set designation (G0-G3) and DEC special graphics

/// A designatable character set
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Charset {
    #[default]
    Ascii,
    DecSpecialGraphics,
}

impl Charset {
    /// Charset named by the final byte of a designation sequence
    pub fn from_designator(final_byte: u8) -> Option<Self> {
        match final_byte {
            b'B' => Some(Charset::Ascii),
            b'0' => Some(Charset::DecSpecialGraphics),
            _ => None,
        }
    }

    fn translate(self, c: char) -> char {
        match self {
            Charset::Ascii => c,
            Charset::DecSpecialGraphics => dec_special_graphics(c),
        }
    }
}

/// G0..G3 designations plus the invoked set
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Charsets {
    slots: [Charset; 4],
    selected: usize,
    single_shift: Option<usize>,
}

impl Charsets {
    /// Designate `charset` into slot `slot` (0-3)
    pub fn designate(&mut self, slot: usize, charset: Charset) {
        if let Some(s) = self.slots.get_mut(slot) {
            *s = charset;
        }
    }

    /// Invoke slot `slot` into GL (SI = 0, SO = 1)
    pub fn invoke(&mut self, slot: usize) {
        if slot < self.slots.len() {
            self.selected = slot;
        }
    }

    /// Use slot `slot` for the next printed character only (SS2/SS3)
    pub fn single_shift(&mut self, slot: usize) {
        if slot < self.slots.len() {
            self.single_shift = Some(slot);
        }
    }

    /// Map a printed character through the active set, consuming any
    /// pending single shift
    pub fn translate(&mut self, c: char) -> char {
        let slot = self.single_shift.take().unwrap_or(self.selected);
        self.slots[slot].translate(c)
    }
}

/// DEC special graphics (line drawing) mapping for 0x5F..=0x7E
fn dec_special_graphics(c: char) -> char {
    match c {
        '_' => ' ',
        '`' => '◆',
        'a' => '▒',
        'b' => '␉',
        'c' => '␌',
        'd' => '␍',
        'e' => '␊',
        'f' => '°',
        'g' => '±',
        'h' => '␤',
        'i' => '␋',
        'j' => '┘',
        'k' => '┐',
        'l' => '┌',
        'm' => '└',
        'n' => '┼',
        'o' => '⎺',
        'p' => '⎻',
        'q' => '─',
        'r' => '⎼',
        's' => '⎽',
        't' => '├',
        'u' => '┤',
        'v' => '┴',
        'w' => '┬',
        'x' => '│',
        'y' => '≤',
        'z' => '≥',
        '{' => 'π',
        '|' => '≠',
        '}' => '£',
        '~' => '·',
        _ => c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_drawing() {
        let mut cs = Charsets::default();
        cs.designate(0, Charset::DecSpecialGraphics);
        assert_eq!(cs.translate('q'), '─');
        assert_eq!(cs.translate('A'), 'A');
        cs.designate(0, Charset::Ascii);
        assert_eq!(cs.translate('q'), 'q');
    }

    #[test]
    fn test_shift_in_out() {
        let mut cs = Charsets::default();
        cs.designate(1, Charset::DecSpecialGraphics);
        cs.invoke(1);
        assert_eq!(cs.translate('x'), '│');
        cs.invoke(0);
        assert_eq!(cs.translate('x'), 'x');
    }

    #[test]
    fn test_single_shift_applies_once() {
        let mut cs = Charsets::default();
        cs.designate(2, Charset::DecSpecialGraphics);
        cs.single_shift(2);
        assert_eq!(cs.translate('l'), '┌');
        assert_eq!(cs.translate('l'), 'l');
    }
}
