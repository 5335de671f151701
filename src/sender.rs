//! 송신자 (서버측)
//!
//! - 파일 요청 대기 → 파일 준비 (다이제스트, 압축, 블록 분할) → INFO 전송 → ACK 대기 → 블록 요청 응답
//! - 요청 단위로 상태 없음: 요청받은 블록만 보냄
//! - BYE나 알 수 없는 파일 요청 시 대기 상태로 복귀

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::block::{Block, BlockBuilder, BlockNumber};
use crate::compress::{Compressor, DeflateCompressor};
use crate::digest::{Digester, Md5Digester};
use crate::packet::{InfoPacket, Packet};
use crate::shutdown::Shutdown;
use crate::stats::TransferStats;
use crate::store::FileStore;
use crate::transport::Transport;
use crate::{Config, Error, Result, INFO_ACK_MESSAGE};

/// 송신자 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    WaitingForFileRequest,
    PreparingFileForTransfer,
    WaitingForInfoAck,
    Transferring,
}

/// 요청 처리 상태
#[derive(Debug, Default)]
struct ServeContext {
    /// 전송 가능한 파일 (시작 시 한 번 스캔)
    servable: HashSet<String>,

    /// 현재 요청자 주소
    requester: Option<SocketAddr>,

    /// 요청된 파일 이름
    requested_file: String,

    /// 준비된 블록
    blocks: HashMap<BlockNumber, Block>,
}

impl ServeContext {
    fn reset(&mut self) {
        self.requester = None;
        self.requested_file.clear();
        self.blocks.clear();
    }
}

/// 송신자
pub struct Sender<T: Transport> {
    transport: T,
    config: Config,
    store: Arc<dyn FileStore>,
    compressor: Arc<dyn Compressor>,
    digester: Arc<dyn Digester>,
    block_builder: BlockBuilder,

    state: SenderState,
    ctx: ServeContext,
    stats: TransferStats,
}

impl<T: Transport> Sender<T> {
    /// 새 송신자 생성, 저장소 목록을 한 번 스캔
    pub fn new(transport: T, store: Arc<dyn FileStore>, config: Config) -> Result<Self> {
        config.validate()?;

        let servable = store.list()?;
        let ctx = ServeContext {
            servable,
            ..Default::default()
        };

        Ok(Self {
            transport,
            block_builder: BlockBuilder::new(config.max_block_size),
            config,
            store,
            compressor: Arc::new(DeflateCompressor::default()),
            digester: Arc::new(Md5Digester),
            state: SenderState::WaitingForFileRequest,
            ctx,
            stats: TransferStats::new(),
        })
    }

    pub fn with_compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.compressor = compressor;
        self
    }

    pub fn with_digester(mut self, digester: Arc<dyn Digester>) -> Self {
        self.digester = digester;
        self
    }

    pub fn state(&self) -> SenderState {
        self.state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// 현재 요청자
    pub fn requester(&self) -> Option<SocketAddr> {
        self.ctx.requester
    }

    /// 전송 가능한 파일 목록
    pub fn servable_files(&self) -> &HashSet<String> {
        &self.ctx.servable
    }

    /// 준비된 블록 수
    pub fn block_count(&self) -> usize {
        self.ctx.blocks.len()
    }

    pub fn stats(&self) -> &TransferStats {
        &self.stats
    }

    /// 종료 요청까지 요청 처리
    ///
    /// 종료 시 마지막 요청자에게 BYE 전송
    pub async fn serve(&mut self, shutdown: &Shutdown) -> Result<()> {
        if self.ctx.servable.is_empty() {
            warn!("I don't have any files to transfer.");
        } else {
            info!("I'll transfer these files:");
            let mut names: Vec<&String> = self.ctx.servable.iter().collect();
            names.sort();
            for name in names {
                info!("  {}", name);
            }
        }

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        while !shutdown.is_triggered() {
            let inbound = self.poll(poll_interval).await?;
            self.step(inbound).await;
        }

        if let Some(requester) = self.ctx.requester {
            self.send(Packet::Bye, requester).await;
        }
        self.reset();

        info!("Sender stopped.");
        Ok(())
    }

    /// 데이터그램 하나 수신 후 디코딩, 잘못된 프레임은 버림
    async fn poll(&mut self, timeout: Duration) -> Result<Option<(Packet, SocketAddr)>> {
        let (bytes, from) = match self.transport.recv_timeout(timeout).await {
            Ok(Some(datagram)) => datagram,
            Ok(None) => return Ok(None),
            Err(Error::ConnectionClosed) => return Err(Error::ConnectionClosed),
            Err(e) => {
                warn!("수신 에러: {}", e);
                return Ok(None);
            }
        };

        match Packet::from_bytes(&bytes) {
            Ok(packet) => Ok(Some((packet, from))),
            Err(e) => {
                debug!("{}에서 온 프레임 폐기 ({} bytes): {}", from, bytes.len(), e);
                self.stats.discarded_frames += 1;
                Ok(None)
            }
        }
    }

    /// 상태 머신 한 틱
    ///
    /// 에러는 로그만 남기고 대기 상태로 돌아감, 루프를 멈추지 않음
    pub async fn step(&mut self, inbound: Option<(Packet, SocketAddr)>) {
        if let Some((Packet::Bye, from)) = &inbound {
            if self.ctx.requester.map_or(true, |r| r == *from) {
                info!("Received a BYE message, waiting for the next client.");
                self.log_summary();
                self.reset();
            }
            return;
        }

        // 현재 요청자 외의 패킷은 대기 상태에서만 받음
        if let (Some((_, from)), Some(requester)) = (&inbound, self.ctx.requester) {
            if *from != requester {
                debug!("현재 요청자({})가 아닌 {}의 패킷 무시", requester, from);
                return;
            }
        }

        match self.state {
            SenderState::WaitingForFileRequest => {
                if let Some((Packet::RequestFile { filename }, from)) = inbound {
                    self.handle_request_file(filename, from).await;
                }
            }

            SenderState::PreparingFileForTransfer => {
                self.handle_prepare().await;
            }

            SenderState::WaitingForInfoAck => {
                if let Some((Packet::Ack { message }, _)) = inbound {
                    if message == INFO_ACK_MESSAGE {
                        info!("Starting Transfer...");
                        self.stats.start();
                        self.state = SenderState::Transferring;
                    }
                }
            }

            SenderState::Transferring => {
                if let Some((Packet::RequestBlock { number }, from)) = inbound {
                    self.handle_request_block(number, from).await;
                }
            }
        }
    }

    async fn handle_request_file(&mut self, filename: String, from: SocketAddr) {
        info!("{} has requested file \"{}\".", from, filename);

        if self.ctx.servable.contains(&filename) {
            info!("  We have it.");
            self.ctx.requester = Some(from);
            self.ctx.requested_file = filename.clone();
            self.stats.reset();
            self.state = SenderState::PreparingFileForTransfer;
            self.send(Packet::ack(filename), from).await;
        } else {
            warn!("  {}", Error::UnknownFile(filename));
            self.reset();
            // 빈 메시지의 ACK가 거부 응답
            self.send(Packet::ack(""), from).await;
        }
    }

    async fn handle_prepare(&mut self) {
        let Some(requester) = self.ctx.requester else {
            self.reset();
            return;
        };

        match self.prepare_file() {
            Ok(info) => {
                info!("Sending INFO, waiting for ACK...");
                self.send(Packet::Info(info), requester).await;
                self.state = SenderState::WaitingForInfoAck;
            }
            Err(e) => {
                warn!("Could not prepare the file for transfer, reason: {}", e);
                self.reset();
            }
        }
    }

    /// 요청된 파일을 읽고 다이제스트 계산, 압축, 블록 분할
    fn prepare_file(&mut self) -> Result<InfoPacket> {
        let name = self.ctx.requested_file.clone();
        info!("Preparing {} for transfer...", name);

        let data = self.store.read(&name)?;
        let file_size =
            u32::try_from(data.len()).map_err(|_| Error::FileTooLarge { size: data.len() as u64 })?;
        let digest = self.digester.digest(&data);
        info!("{} is {} bytes large.", name, file_size);

        let started = Instant::now();
        let compressed = self.compressor.compress(&data)?;
        info!(
            "{} compressed is {} bytes large in {:.2}s.",
            name,
            compressed.len(),
            started.elapsed().as_secs_f64()
        );

        let blocks = self.block_builder.split_into_blocks(&compressed);
        let block_count = u32::try_from(blocks.len()).map_err(|_| Error::FileTooLarge {
            size: data.len() as u64,
        })?;

        self.ctx.blocks = blocks.into_iter().map(|b| (b.number, b)).collect();
        info!(
            "Sending the file in {} blocks, using a max block size of {} bytes.",
            block_count, self.config.max_block_size
        );

        Ok(InfoPacket {
            digest,
            file_size,
            max_block_size: self.config.max_block_size as u32,
            block_count,
        })
    }

    async fn handle_request_block(&mut self, number: BlockNumber, from: SocketAddr) {
        debug!("Got request for block #{}", number);
        self.stats.requests += 1;

        // 없는 블록 요청은 상대의 프로토콜 위반, 무시
        let Some(block) = self.ctx.blocks.get(&number).cloned() else {
            warn!("없는 블록 #{} 요청 무시", number);
            self.stats.out_of_range += 1;
            return;
        };

        let len = block.data.len();
        self.send(Packet::Send(block), from).await;
        self.stats.blocks += 1;
        self.stats.bytes += len as u64;
        debug!("Sent block #{} [{} bytes]", number, len);
    }

    fn log_summary(&self) {
        if self.state == SenderState::Transferring {
            info!("{}", self.stats.summary());
        }
    }

    fn reset(&mut self) {
        self.state = SenderState::WaitingForFileRequest;
        self.ctx.reset();
    }

    async fn send(&self, packet: Packet, dest: SocketAddr) {
        if let Err(e) = self.transport.send_to(&packet.to_bytes(), dest).await {
            warn!("{} 전송 실패 → {}: {}", packet.kind(), dest, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketKind;
    use crate::store::MemoryStore;
    use crate::transport::{MemoryNetwork, MemoryTransport};

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn sender_with(store: MemoryStore, max_block_size: usize) -> Sender<MemoryTransport> {
        let (local, _client) = MemoryNetwork::pair(addr(6000), addr(5000));
        let config = Config::default().with_max_block_size(max_block_size);
        Sender::new(local, Arc::new(store), config).unwrap()
    }

    fn sent_packets(sender: &Sender<MemoryTransport>) -> Vec<(Packet, SocketAddr)> {
        sender
            .transport()
            .sent()
            .iter()
            .map(|(bytes, dest)| (Packet::from_bytes(bytes).unwrap(), *dest))
            .collect()
    }

    async fn drive_to_transfer(sender: &mut Sender<MemoryTransport>, client: SocketAddr) {
        sender
            .step(Some((Packet::request_file("a.txt"), client)))
            .await;
        assert_eq!(sender.state(), SenderState::PreparingFileForTransfer);

        sender.step(None).await;
        assert_eq!(sender.state(), SenderState::WaitingForInfoAck);

        sender.step(Some((Packet::ack("INFO"), client))).await;
        assert_eq!(sender.state(), SenderState::Transferring);
    }

    #[tokio::test]
    async fn test_unknown_file_never_leaves_idle() {
        let store = MemoryStore::new().with_file("a.txt", b"hello world".to_vec());
        let mut sender = sender_with(store, 8192);

        sender
            .step(Some((Packet::request_file("b.txt"), addr(5000))))
            .await;
        sender.step(None).await;
        sender.step(None).await;

        assert_eq!(sender.state(), SenderState::WaitingForFileRequest);
        assert!(sender.requester().is_none());

        let sent = sent_packets(&sender);
        assert_eq!(sent, vec![(Packet::ack(""), addr(5000))]);
        assert!(sent.iter().all(|(p, _)| p.kind() != PacketKind::Info));
    }

    #[tokio::test]
    async fn test_serves_requested_blocks() {
        let store = MemoryStore::new().with_file("a.txt", b"hello world".to_vec());
        let mut sender = sender_with(store, 8192);
        let client = addr(5000);
        drive_to_transfer(&mut sender, client).await;

        sender
            .step(Some((Packet::request_block(1), client)))
            .await;

        let sent = sent_packets(&sender);
        assert_eq!(sent[0], (Packet::ack("a.txt"), client));

        let Packet::Info(info) = &sent[1].0 else {
            panic!("expected INFO, got {:?}", sent[1].0);
        };
        assert_eq!(info.file_size, 11);
        assert_eq!(info.max_block_size, 8192);
        assert_eq!(info.block_count, 1);
        assert_eq!(info.digest, Md5Digester.digest(b"hello world"));

        let Packet::Send(block) = &sent[2].0 else {
            panic!("expected SEND, got {:?}", sent[2].0);
        };
        assert_eq!(block.number, 1);
        let restored = DeflateCompressor::default().decompress(&block.data).unwrap();
        assert_eq!(restored, b"hello world");
    }

    #[tokio::test]
    async fn test_missing_block_request_is_ignored() {
        let store = MemoryStore::new().with_file("a.txt", b"hello world".to_vec());
        let mut sender = sender_with(store, 8192);
        let client = addr(5000);
        drive_to_transfer(&mut sender, client).await;
        sender.transport().clear_sent();

        sender
            .step(Some((Packet::request_block(0), client)))
            .await;
        sender
            .step(Some((Packet::request_block(99), client)))
            .await;

        assert!(sent_packets(&sender).is_empty());
        assert_eq!(sender.state(), SenderState::Transferring);
        assert_eq!(sender.stats().out_of_range, 2);
    }

    #[tokio::test]
    async fn test_bye_from_requester_resets() {
        let store = MemoryStore::new().with_file("a.txt", b"hello world".to_vec());
        let mut sender = sender_with(store, 8192);
        let client = addr(5000);
        drive_to_transfer(&mut sender, client).await;

        // 다른 주소의 BYE는 무시
        sender.step(Some((Packet::Bye, addr(7000)))).await;
        assert_eq!(sender.state(), SenderState::Transferring);

        sender.step(Some((Packet::Bye, client))).await;
        assert_eq!(sender.state(), SenderState::WaitingForFileRequest);
        assert!(sender.requester().is_none());
        assert_eq!(sender.block_count(), 0);
    }

    #[tokio::test]
    async fn test_other_peers_ignored_while_busy() {
        let store = MemoryStore::new().with_file("a.txt", b"hello world".to_vec());
        let mut sender = sender_with(store, 8192);
        let client = addr(5000);
        drive_to_transfer(&mut sender, client).await;
        sender.transport().clear_sent();

        sender
            .step(Some((Packet::request_block(1), addr(7000))))
            .await;
        assert!(sent_packets(&sender).is_empty());
    }

    #[tokio::test]
    async fn test_prepare_failure_resets() {
        // 목록에는 있지만 읽을 수 없는 파일
        struct BrokenStore;
        impl FileStore for BrokenStore {
            fn list(&self) -> Result<HashSet<String>> {
                Ok(["a.txt".to_string()].into_iter().collect())
            }
            fn read(&self, name: &str) -> Result<Vec<u8>> {
                Err(Error::UnknownFile(name.to_string()))
            }
            fn write(&self, _path: &std::path::Path, _data: &[u8]) -> Result<()> {
                Ok(())
            }
        }

        let (local, _client) = MemoryNetwork::pair(addr(6000), addr(5000));
        let mut sender = Sender::new(local, Arc::new(BrokenStore), Config::default()).unwrap();

        sender
            .step(Some((Packet::request_file("a.txt"), addr(5000))))
            .await;
        sender.step(None).await;

        assert_eq!(sender.state(), SenderState::WaitingForFileRequest);
        assert!(sent_packets(&sender)
            .iter()
            .all(|(p, _)| p.kind() != PacketKind::Info));
    }

    #[tokio::test]
    async fn test_blocks_are_dense_from_one() {
        let data: Vec<u8> = {
            use rand::{Rng, SeedableRng};
            let mut rng = rand::rngs::StdRng::seed_from_u64(3);
            (0..10_000).map(|_| rng.gen()).collect()
        };
        let store = MemoryStore::new().with_file("a.txt", data);
        let mut sender = sender_with(store, 1000);
        drive_to_transfer(&mut sender, addr(5000)).await;

        let count = sender.block_count() as u32;
        assert!(count >= 10);
        for n in 1..=count {
            assert!(sender.ctx.blocks.contains_key(&n));
        }
        let max = sender.ctx.blocks.values().map(|b| b.data.len()).max().unwrap();
        assert!(max <= 1000);
    }

    #[tokio::test]
    async fn test_shutdown_sends_bye_to_requester() {
        let store = MemoryStore::new().with_file("a.txt", b"hello world".to_vec());
        let mut sender = sender_with(store, 8192);
        let client = addr(5000);
        drive_to_transfer(&mut sender, client).await;
        sender.transport().clear_sent();

        let shutdown = Shutdown::new();
        shutdown.trigger();
        sender.serve(&shutdown).await.unwrap();

        assert_eq!(sent_packets(&sender), vec![(Packet::Bye, client)]);
        assert_eq!(sender.state(), SenderState::WaitingForFileRequest);
    }
}
