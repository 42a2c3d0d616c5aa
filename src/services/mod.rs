pub mod calendar;
pub mod dialog;
pub mod messaging;
pub mod voice;
