//! 데이터그램 전송 계층
//!
//! - UdpTransport: tokio UDP 소켓
//! - MemoryNetwork: 프로세스 내 채널로 연결된 가상 네트워크 (테스트, 임베딩용)

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::net::{ToSocketAddrs, UdpSocket};
use tokio::sync::mpsc;

use crate::{Error, Result};

/// 수신된 데이터그램 (내용, 보낸 주소)
pub type Datagram = (Vec<u8>, SocketAddr);

/// 데이터그램 전송 계층
#[async_trait]
pub trait Transport: Send + Sync {
    /// 데이터그램 하나 전송
    async fn send_to(&self, bytes: &[u8], dest: SocketAddr) -> Result<()>;

    /// 데이터그램 하나 수신, `timeout` 안에 없으면 `None`
    async fn recv_timeout(&self, timeout: Duration) -> Result<Option<Datagram>>;

    /// 로컬 주소
    fn local_addr(&self) -> Result<SocketAddr>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send_to(&self, bytes: &[u8], dest: SocketAddr) -> Result<()> {
        (**self).send_to(bytes, dest).await
    }

    async fn recv_timeout(&self, timeout: Duration) -> Result<Option<Datagram>> {
        (**self).recv_timeout(timeout).await
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        (**self).local_addr()
    }
}

/// UDP 소켓 전송 계층
pub struct UdpTransport {
    socket: UdpSocket,
    buf: tokio::sync::Mutex<Vec<u8>>,
}

impl UdpTransport {
    /// 소켓 바인딩
    pub async fn bind(addr: impl ToSocketAddrs, recv_buffer_size: usize) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self::from_socket(socket, recv_buffer_size))
    }

    pub fn from_socket(socket: UdpSocket, recv_buffer_size: usize) -> Self {
        Self {
            socket,
            buf: tokio::sync::Mutex::new(vec![0u8; recv_buffer_size]),
        }
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send_to(&self, bytes: &[u8], dest: SocketAddr) -> Result<()> {
        self.socket.send_to(bytes, dest).await?;
        Ok(())
    }

    async fn recv_timeout(&self, timeout: Duration) -> Result<Option<Datagram>> {
        let mut buf = self.buf.lock().await;
        let result = tokio::time::timeout(timeout, self.socket.recv_from(&mut buf[..])).await;
        match result {
            Ok(Ok((len, addr))) => Ok(Some((buf[..len].to_vec(), addr))),
            Ok(Err(e)) => Err(Error::Io(e)),
            // 타임아웃, 이번 틱에는 수신 없음
            Err(_) => Ok(None),
        }
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

/// 주소별 수신 채널
type Routes = Arc<RwLock<HashMap<SocketAddr, mpsc::UnboundedSender<Datagram>>>>;

/// 프로세스 내 가상 네트워크
///
/// 등록되지 않은 주소로 보낸 데이터그램은 UDP처럼 조용히 사라짐
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    routes: Routes,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// 주소에 엔드포인트 생성
    pub fn endpoint(&self, addr: SocketAddr) -> MemoryTransport {
        let (tx, rx) = mpsc::unbounded_channel();
        self.routes.write().insert(addr, tx);

        MemoryTransport {
            local: addr,
            routes: self.routes.clone(),
            rx: tokio::sync::Mutex::new(rx),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// 두 엔드포인트를 만들어 반환
    pub fn pair(a: SocketAddr, b: SocketAddr) -> (MemoryTransport, MemoryTransport) {
        let network = Self::new();
        (network.endpoint(a), network.endpoint(b))
    }
}

/// 가상 네트워크의 엔드포인트
pub struct MemoryTransport {
    local: SocketAddr,
    routes: Routes,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Datagram>>,
    sent: Mutex<Vec<Datagram>>,
}

impl MemoryTransport {
    /// 지금까지 보낸 데이터그램 (내용, 목적지)
    pub fn sent(&self) -> Vec<Datagram> {
        self.sent.lock().clone()
    }

    /// 보낸 기록 비우기
    pub fn clear_sent(&self) {
        self.sent.lock().clear();
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send_to(&self, bytes: &[u8], dest: SocketAddr) -> Result<()> {
        self.sent.lock().push((bytes.to_vec(), dest));

        let route = self.routes.read().get(&dest).cloned();
        if let Some(tx) = route {
            // 상대가 사라졌으면 버림
            let _ = tx.send((bytes.to_vec(), self.local));
        }
        Ok(())
    }

    async fn recv_timeout(&self, timeout: Duration) -> Result<Option<Datagram>> {
        let mut rx = self.rx.lock().await;
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(datagram)) => Ok(Some(datagram)),
            Ok(None) => Err(Error::ConnectionClosed),
            Err(_) => Ok(None),
        }
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.local)
    }
}
