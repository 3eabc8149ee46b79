use crate::domain::ports::MovieStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// 匯入期間定期 ping 資料庫，避免長時間匯入被閒置逾時斷線
///
/// 背景任務在 `KeepAlive` 被 drop 時中止，所以任何離開路徑都會停掉計時器。
pub struct KeepAlive {
    handle: JoinHandle<()>,
}

impl KeepAlive {
    pub fn spawn<S: MovieStore>(store: Arc<S>, interval: Duration) -> Self {
        let interval = interval.max(MIN_INTERVAL);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Err(e) = store.ping().await else {
                    tracing::trace!("Keep-alive ping ok");
                    continue;
                };

                tracing::warn!("⚠️ Keep-alive ping failed: {}, reconnecting", e);
                match store.reconnect().await {
                    Ok(()) => tracing::info!("🔌 Storage connection re-established"),
                    Err(e) => {
                        // 放棄保活；之後的寫入會自行回報錯誤
                        tracing::warn!("⚠️ Reconnect failed, keep-alive stopped: {}", e);
                        return;
                    }
                }
            }
        });

        Self { handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for KeepAlive {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
