pub mod one_shot;
pub mod sound;
pub mod toast;

pub use one_shot::{OneShotAudio, SoundFlag};
pub use sound::{play_best_effort, player_from_config, spawn_play, CommandPlayer, MutedPlayer, SoundPlayer};
pub use toast::{Toast, ToastQueue, ToastSink, TracingToasts};
