use courier_core::types::SoundCategory;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::sound::{play_best_effort, SoundPlayer};

/// "Play a sound" request shared between whoever raises it and the
/// [`OneShotAudio`] that consumes it. Raising an already raised flag is a no-op.
#[derive(Debug, Clone)]
pub struct SoundFlag {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for SoundFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl SoundFlag {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn raise(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_raised(&self) -> bool {
        *self.tx.borrow()
    }

    fn clear(&self) {
        self.tx.send_replace(false);
    }

    fn watch(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Plays one sound each time the flag goes up and lowers it when playback ends.
pub struct OneShotAudio {
    flag: SoundFlag,
    player: Arc<dyn SoundPlayer>,
    category: SoundCategory,
}

impl OneShotAudio {
    pub fn new(flag: SoundFlag, player: Arc<dyn SoundPlayer>, category: SoundCategory) -> Self {
        Self {
            flag,
            player,
            category,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut rx = self.flag.watch();
            loop {
                let raised = *rx.borrow_and_update();
                if raised {
                    play_best_effort(self.player.as_ref(), self.category).await;
                    self.flag.clear();
                    // our own clear marks the receiver changed; consume it
                    rx.borrow_and_update();
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use courier_core::CourierResult;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingPlayer {
        plays: AtomicUsize,
    }

    #[async_trait]
    impl SoundPlayer for CountingPlayer {
        async fn play(&self, _category: SoundCategory) -> CourierResult<()> {
            self.plays.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn plays_once_per_raise_and_clears_flag() {
        let flag = SoundFlag::new();
        let player = Arc::new(CountingPlayer::default());
        let task = OneShotAudio::new(flag.clone(), player.clone(), SoundCategory::Appointment).spawn();

        flag.raise();
        settle().await;
        assert_eq!(player.plays.load(Ordering::SeqCst), 1);
        assert!(!flag.is_raised());

        flag.raise();
        settle().await;
        assert_eq!(player.plays.load(Ordering::SeqCst), 2);

        task.abort();
    }

    #[tokio::test]
    async fn idle_flag_plays_nothing() {
        let flag = SoundFlag::new();
        let player = Arc::new(CountingPlayer::default());
        let task = OneShotAudio::new(flag.clone(), player.clone(), SoundCategory::Appointment).spawn();

        settle().await;
        assert_eq!(player.plays.load(Ordering::SeqCst), 0);
        task.abort();
    }
}
