use serde::{Serialize, Serializer};

/// Mouth shapes understood by the avatar rig
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Viseme {
    Silence,
    PP,
    FF,
    TH,
    DD,
    KK,
    CH,
    SS,
    NN,
    RR,
    AA,
    E,
    I,
    O,
    U,
}

impl Viseme {
    pub const ALL: [Viseme; 15] = [
        Viseme::Silence,
        Viseme::PP,
        Viseme::FF,
        Viseme::TH,
        Viseme::DD,
        Viseme::KK,
        Viseme::CH,
        Viseme::SS,
        Viseme::NN,
        Viseme::RR,
        Viseme::AA,
        Viseme::E,
        Viseme::I,
        Viseme::O,
        Viseme::U,
    ];

    /// Blend target name on the avatar mesh
    pub fn target_name(&self) -> &'static str {
        match self {
            Viseme::Silence => "viseme_sil",
            Viseme::PP => "viseme_PP",
            Viseme::FF => "viseme_FF",
            Viseme::TH => "viseme_TH",
            Viseme::DD => "viseme_DD",
            Viseme::KK => "viseme_kk",
            Viseme::CH => "viseme_CH",
            Viseme::SS => "viseme_SS",
            Viseme::NN => "viseme_nn",
            Viseme::RR => "viseme_RR",
            Viseme::AA => "viseme_aa",
            Viseme::E => "viseme_E",
            Viseme::I => "viseme_I",
            Viseme::O => "viseme_O",
            Viseme::U => "viseme_U",
        }
    }

    /// Map an alignment label to a viseme
    ///
    /// Accepts ARPAbet phonemes (stress digits ignored) and single
    /// characters. Whitespace, punctuation and anything unrecognised is
    /// silence.
    pub fn from_label(label: &str) -> Viseme {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return Viseme::Silence;
        }

        let phoneme: String = trimmed
            .chars()
            .filter(|c| !c.is_ascii_digit())
            .collect::<String>()
            .to_ascii_lowercase();

        if let Some(v) = Self::from_phoneme(&phoneme) {
            return v;
        }

        let mut chars = phoneme.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c),
            _ => Viseme::Silence,
        }
    }

    fn from_phoneme(phoneme: &str) -> Option<Viseme> {
        let v = match phoneme {
            "sil" | "sp" | "spn" | "pau" => Viseme::Silence,
            "p" | "b" | "m" => Viseme::PP,
            "f" | "v" => Viseme::FF,
            "th" | "dh" => Viseme::TH,
            "t" | "d" => Viseme::DD,
            "k" | "g" | "ng" | "hh" => Viseme::KK,
            "ch" | "jh" | "sh" | "zh" => Viseme::CH,
            "s" | "z" => Viseme::SS,
            "n" | "l" => Viseme::NN,
            "r" | "er" => Viseme::RR,
            "aa" | "ae" | "ah" | "ay" | "aw" => Viseme::AA,
            "eh" | "ey" => Viseme::E,
            "ih" | "iy" | "y" => Viseme::I,
            "ao" | "ow" | "oy" => Viseme::O,
            "uh" | "uw" | "w" => Viseme::U,
            _ => return None,
        };
        Some(v)
    }

    fn from_char(c: char) -> Viseme {
        match c {
            'a' => Viseme::AA,
            'e' => Viseme::E,
            'i' | 'y' => Viseme::I,
            'o' => Viseme::O,
            'u' | 'w' => Viseme::U,
            'b' | 'm' | 'p' => Viseme::PP,
            'f' | 'v' => Viseme::FF,
            't' | 'd' => Viseme::DD,
            'k' | 'g' | 'c' | 'q' | 'x' | 'h' => Viseme::KK,
            'j' => Viseme::CH,
            's' | 'z' => Viseme::SS,
            'n' | 'l' => Viseme::NN,
            'r' => Viseme::RR,
            _ => Viseme::Silence,
        }
    }
}

impl Serialize for Viseme {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.target_name())
    }
}

/// A blend target and how strongly it is applied
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VisemeWeight {
    pub viseme: Viseme,
    pub weight: f32,
}

impl VisemeWeight {
    pub fn full(viseme: Viseme) -> Self {
        Self { viseme, weight: 1.0 }
    }

    pub fn silence() -> Self {
        Self::full(Viseme::Silence)
    }
}
