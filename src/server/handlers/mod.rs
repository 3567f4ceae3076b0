pub mod health;
pub mod playlist;
pub mod segment;
pub mod stream;
