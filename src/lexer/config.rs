/// Built-in configurations. Each one starts from the whitespace setup (every
/// character up to `\u{ff}` is a word character, `\0..=' '` are whitespace)
/// and registers its quote pairs on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preset {
    Whitespace,
    TwoQuote,
    #[default]
    ThreeQuote,
    TwoQuoteDollarCurly,
    ThreeQuoteDollarCurly,
}

impl Preset {
    pub fn quote_pairs(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Preset::Whitespace => &[],
            Preset::TwoQuote => &[("\"", "\""), ("'", "'")],
            Preset::ThreeQuote => &[("\"", "\""), ("'", "'"), ("`", "`")],
            Preset::TwoQuoteDollarCurly => &[("\"", "\""), ("'", "'"), ("${", "}")],
            Preset::ThreeQuoteDollarCurly => {
                &[("\"", "\""), ("'", "'"), ("`", "`"), ("${", "}")]
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct LexerConfig {
    pub escape: Option<char>,
    pub preset: Preset,
    pub keywords: Vec<String>,
}

impl Default for LexerConfig {
    fn default() -> Self {
        LexerConfig {
            escape: Some('\\'),
            preset: Preset::default(),
            keywords: Vec::new(),
        }
    }
}
