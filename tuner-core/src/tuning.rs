//! # Musical Tuning Module
//!
//! Equal-temperament arithmetic for the tuner: frequency to note number, note
//! number to name and octave, the exact frequency of a note, and the offset of a
//! measured frequency from that note in cents.
//!
//! ## Conventions
//! - Note numbers follow the MIDI scale: 69 is A4 (440 Hz), 60 is middle C, 0 is C-1
//! - Note names use sharps written with the `♯` sign
//! - Octaves change at C, so B3 is followed by C4
//! - Cents are floored, so a pitch 0.4 cents flat of A4 reads as -1

/// Reference pitch of A4 in Hz.
pub const A4_FREQUENCY: f64 = 440.0;

/// Note number of A4.
pub const A4_NOTE_NUMBER: i32 = 69;

/// Chromatic note names starting at C.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C♯", "D", "D♯", "E", "F", "F♯", "G", "G♯", "A", "A♯", "B",
];

/// Finds the note number nearest to a frequency.
///
/// # Arguments
/// * `frequency` - Frequency in Hz; must be positive and finite
pub fn note_number(frequency: f64) -> i32 {
    (12.0 * (frequency / A4_FREQUENCY).log2()).round() as i32 + A4_NOTE_NUMBER
}

/// Name of a note without its octave, e.g. `"G♯"`.
pub fn note_name(note: i32) -> &'static str {
    NOTE_NAMES[note.rem_euclid(12) as usize]
}

/// Octave of a note; C4 (note 60) is in octave 4.
pub fn octave(note: i32) -> i32 {
    note.div_euclid(12) - 1
}

/// Exact equal-temperament frequency of a note in Hz.
pub fn note_frequency(note: i32) -> f64 {
    A4_FREQUENCY * 2.0_f64.powf((f64::from(note) - f64::from(A4_NOTE_NUMBER)) / 12.0)
}

/// Calculates the deviation of `frequency` from a note's exact pitch in cents.
///
/// - 100 cents = 1 semitone
/// - Positive values are sharp, negative values are flat
/// - The result is floored toward negative infinity
pub fn cents_off(frequency: f64, note: i32) -> i32 {
    (1200.0 * (frequency / note_frequency(note)).log2()).floor() as i32
}

/// Full name of a note with its octave, e.g. `"A4"` or `"C♯-1"`.
pub fn note_label(note: i32) -> String {
    format!("{}{}", note_name(note), octave(note))
}
