//! 협조적 종료 플래그
//!
//! 루프는 틱마다 한 번 확인하고, 현재 틱의 작업을 마친 뒤 종료

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 종료 요청 플래그 (복제 시 같은 플래그 공유)
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// 종료 요청
    pub fn trigger(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// 종료 요청 여부
    pub fn is_triggered(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Ctrl-C 수신 시 종료 요청하는 태스크 등록
    pub fn install_ctrl_c(&self) {
        let shutdown = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, shutting down...");
                shutdown.trigger();
            }
        });
    }
}
