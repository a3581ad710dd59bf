pub mod entities;
pub mod time;
