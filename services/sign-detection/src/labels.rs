//! Selector keys and the positional label tables of the shipped models.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Letter signs, index-aligned with the `full` model outputs.
pub const LETTER_LABELS: [&str; 26] = [
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M",
    "N", "O", "P", "Q", "R", "S", "T", "U", "V", "W", "X", "Y", "Z",
];

/// Word signs in training folder order, index-aligned with the `words` model outputs.
pub const WORD_LABELS: [&str; 102] = [
    "Adik_P", "Air", "Aku", "Anda", "Anjing", "Awalan", "Awan", "Ayah",
    "Ayam", "Baca", "Bangun", "Baru", "Berat", "Besar", "Burung", "Cepat",
    "Cerah", "Danau", "Dengan", "Doa", "Foto", "Gelap", "Gunung", "Guru",
    "Hari", "Hujan", "Hutan", "Ibu", "Ini", "Itu", "Jam", "Jendela",
    "Jumat", "Kakak", "Kamis", "Kamu", "Kecil", "Kelinci", "Kenyang", "Kereta",
    "Kerja", "Kertas", "Kipas", "Kita", "Kolam", "Kucing", "Kuda", "Kursi",
    "Lama", "Lambat", "Lapar", "Lihat", "Mahal", "Main", "Makan", "Malam",
    "Masak", "Matahari", "Meja", "Mendung", "Mereka", "Minggu", "Minum", "Mobil",
    "Motor", "Murah", "Musuh", "Pagi", "Panjang", "Papan", "Pendek", "Pensil",
    "Pesawat", "Pintu", "Polisi", "Pulpen", "Rabu", "Ringan", "Roti", "Rumah",
    "Rumput", "Sabtu", "Sama", "Sapi", "Sawah", "Saya", "Sedang", "Selasa",
    "Senin", "Senyum", "Sore", "Suasana", "Sungai", "Takut", "Telepon", "Teman",
    "Tentara", "Terang", "Tugas", "Tulis", "Tunjuk", "Ular",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown model selector '{0}'")]
pub struct UnknownSelector(pub String);

/// Closed set of model selectors the service knows how to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ModelKind {
    #[serde(rename = "full")]
    Letters,
    #[serde(rename = "words")]
    Words,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::Letters, ModelKind::Words];

    pub fn selector(self) -> &'static str {
        match self { ModelKind::Letters => "full", ModelKind::Words => "words" }
    }

    /// Artifact file name relative to the models directory.
    pub fn artifact(self) -> &'static str {
        match self { ModelKind::Letters => "alexnet_best_full.onnx", ModelKind::Words => "alexnet_best_words.onnx" }
    }

    pub fn labels(self) -> &'static [&'static str] {
        match self { ModelKind::Letters => &LETTER_LABELS, ModelKind::Words => &WORD_LABELS }
    }

    pub fn describe(self) -> &'static str {
        match self { ModelKind::Letters => "letter", ModelKind::Words => "word" }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.selector()) }
}

impl FromStr for ModelKind {
    type Err = UnknownSelector;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelKind::ALL.into_iter().find(|k| k.selector() == s).ok_or_else(|| UnknownSelector(s.to_string()))
    }
}
