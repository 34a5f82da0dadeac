pub mod anki;
pub mod audio;
pub mod core;
pub mod organizer;
pub mod persistence;
pub mod thesession;
