pub mod cable;
pub mod local;
pub mod protocol;

pub use cable::CableClient;
pub use local::LocalHub;
