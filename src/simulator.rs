//! 손실 네트워크 시뮬레이터
//!
//! 임의의 전송 계층을 감싸서 나가는 데이터 단계 패킷(REQB/SEND)을 확률적으로 버림.
//! 제어 핸드쉐이크(REQF/ACK/INFO/BYE)는 신뢰 가능하다고 가정하므로 그대로 통과.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::packet::RawPacket;
use crate::transport::{Datagram, Transport};
use crate::Result;

/// 손실 주입 전송 계층
pub struct LossyTransport<T> {
    inner: T,
    loss_rate: f64,
    rng: Mutex<StdRng>,
    dropped: AtomicU64,
}

impl<T: Transport> LossyTransport<T> {
    /// `loss_rate`: 0.0 ~ 1.0
    pub fn new(inner: T, loss_rate: f64, seed: u64) -> Self {
        Self {
            inner,
            loss_rate: loss_rate.clamp(0.0, 1.0),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            dropped: AtomicU64::new(0),
        }
    }

    /// 버린 데이터그램 수
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    fn should_drop(&self, bytes: &[u8]) -> bool {
        let data_plane = RawPacket::from_bytes(bytes)
            .map(|raw| raw.kind().is_data_plane())
            .unwrap_or(false);

        data_plane && self.rng.lock().gen_bool(self.loss_rate)
    }
}

#[async_trait]
impl<T: Transport> Transport for LossyTransport<T> {
    async fn send_to(&self, bytes: &[u8], dest: SocketAddr) -> Result<()> {
        if self.should_drop(bytes) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            trace!("시뮬레이터: {} bytes 버림 → {}", bytes.len(), dest);
            return Ok(());
        }
        self.inner.send_to(bytes, dest).await
    }

    async fn recv_timeout(&self, timeout: Duration) -> Result<Option<Datagram>> {
        self.inner.recv_timeout(timeout).await
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        self.inner.local_addr()
    }
}
