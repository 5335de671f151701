//! 수신자 (요청측)
//!
//! - 파일 요청 → ACK 대기 → INFO 대기 → 블록 요청/수집 → 조립, 검증, 저장
//! - 틱마다 인바운드 패킷 최대 하나 처리, 블록 요청 최대 하나 전송
//! - 거부/불일치 시 상태 전체를 초기화하고 다시 요청

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::block::Block;
use crate::compress::{Compressor, DeflateCompressor};
use crate::digest::{to_hex, Digest, Digester, Md5Digester};
use crate::packet::{InfoPacket, Packet};
use crate::config::MAX_DATAGRAM_SIZE;
use crate::reliability::{Insertion, RequestTracker, MAX_BLOCK_COUNT};
use crate::shutdown::Shutdown;
use crate::stats::TransferStats;
use crate::store::{DirStore, FileStore};
use crate::transport::Transport;
use crate::{Config, Error, Result, INFO_ACK_MESSAGE};

/// 수신자 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    RequestingFile,
    WaitingForRequestFileAck,
    WaitingForInfo,
    PreparingForTransfer,
    Transferring,
    TransferSuccessful,
}

/// 다운로드 결과
#[derive(Debug, Clone)]
pub enum TransferOutcome {
    /// 검증 후 저장 완료
    Completed(TransferReport),

    /// 송신자가 BYE로 중단
    PeerAborted,

    /// 사용자가 취소
    UserCanceled,
}

/// 성공한 전송의 요약
#[derive(Debug, Clone)]
pub struct TransferReport {
    pub filename: String,
    pub destination: PathBuf,
    pub bytes_written: usize,
    pub compressed_size: usize,
    pub block_count: u32,
    pub requests: u64,
    pub duplicates: u64,
    pub elapsed: Duration,
}

impl TransferReport {
    /// 성공률: 블록 수 / 발행한 요청 수
    pub fn success_ratio(&self) -> f64 {
        if self.requests == 0 {
            return 0.0;
        }
        self.block_count as f64 / self.requests as f64
    }
}

/// 한 번의 다운로드 시도 상태
#[derive(Debug, Default)]
struct TransferState {
    /// INFO로 받은 다이제스트
    digest: Option<Digest>,

    /// 원본 파일 크기
    file_size: u32,

    /// 예상 블록 수
    block_count: u32,

    /// 블록 요청 추적기
    tracker: RequestTracker,

    /// 전송 통계
    stats: TransferStats,
}

impl TransferState {
    fn reset(&mut self) {
        self.digest = None;
        self.file_size = 0;
        self.block_count = 0;
        self.tracker.reset();
        self.stats.reset();
    }
}

/// 수신자
pub struct Receiver<T: Transport> {
    transport: T,
    server_addr: SocketAddr,
    config: Config,
    store: Arc<dyn FileStore>,
    compressor: Arc<dyn Compressor>,
    digester: Arc<dyn Digester>,

    state: ReceiverState,
    transfer: TransferState,

    /// 요청 대상 파일
    filename: String,

    /// 저장 경로
    destination: PathBuf,

    /// 이번 다운로드에서 보낸 REQF 수
    attempts: u32,

    /// 마지막 인바운드 패킷 시각
    last_activity: Instant,
}

impl<T: Transport> Receiver<T> {
    /// 새 수신자 생성
    pub fn new(transport: T, server_addr: SocketAddr, config: Config) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            transport,
            server_addr,
            config,
            store: Arc::new(DirStore::new(".")),
            compressor: Arc::new(DeflateCompressor::default()),
            digester: Arc::new(Md5Digester),
            state: ReceiverState::RequestingFile,
            transfer: TransferState::default(),
            filename: String::new(),
            destination: PathBuf::new(),
            attempts: 0,
            last_activity: Instant::now(),
        })
    }

    pub fn with_store(mut self, store: Arc<dyn FileStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.compressor = compressor;
        self
    }

    pub fn with_digester(mut self, digester: Arc<dyn Digester>) -> Self {
        self.digester = digester;
        self
    }

    pub fn state(&self) -> ReceiverState {
        self.state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// 현재 시도의 요청 추적기
    pub fn tracker(&self) -> &RequestTracker {
        &self.transfer.tracker
    }

    /// 파일 하나를 받아 `destination`에 저장
    ///
    /// 성공, 송신자 중단, 사용자 취소 중 하나로 끝나며 어떤 경우든 상태를 초기화함
    pub async fn get_file(
        &mut self,
        filename: &str,
        destination: impl AsRef<Path>,
        shutdown: &Shutdown,
    ) -> Result<TransferOutcome> {
        info!("Requesting file: {}", filename);
        self.begin(filename, destination);

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            let inbound = self.poll(poll_interval).await?;

            match self.step(inbound).await {
                Ok(Some(outcome)) => return Ok(outcome),
                Ok(None) => {}
                Err(e) => {
                    self.reset();
                    return Err(e);
                }
            }

            if shutdown.is_triggered() {
                info!("User canceled transfer.");
                self.send(Packet::Bye).await;
                self.reset();
                return Ok(TransferOutcome::UserCanceled);
            }

            if self.is_idle() {
                let idle_ms = self.config.idle_timeout_ms;
                warn!("{}ms 동안 응답 없음, 전송 중단", idle_ms);
                self.send(Packet::Bye).await;
                self.reset();
                return Err(Error::IdleTimeout { idle_ms });
            }
        }
    }

    /// 새 다운로드 시작 준비
    pub fn begin(&mut self, filename: &str, destination: impl AsRef<Path>) {
        self.reset();
        self.filename = filename.to_string();
        self.destination = destination.as_ref().to_path_buf();
        self.last_activity = Instant::now();
    }

    /// 데이터그램 하나 수신 후 디코딩
    ///
    /// 서버가 아닌 곳에서 온 것, 잘못된 프레임은 버림
    async fn poll(&mut self, timeout: Duration) -> Result<Option<Packet>> {
        let (bytes, from) = match self.transport.recv_timeout(timeout).await {
            Ok(Some(datagram)) => datagram,
            Ok(None) => return Ok(None),
            Err(Error::ConnectionClosed) => return Err(Error::ConnectionClosed),
            Err(e) => {
                warn!("수신 에러: {}", e);
                return Ok(None);
            }
        };

        if from != self.server_addr {
            debug!("알 수 없는 주소 {}에서 온 데이터그램 무시", from);
            return Ok(None);
        }

        match Packet::from_bytes(&bytes) {
            Ok(packet) => {
                self.last_activity = Instant::now();
                Ok(Some(packet))
            }
            Err(e) => {
                debug!("프레임 폐기 ({} bytes): {}", bytes.len(), e);
                self.transfer.stats.discarded_frames += 1;
                Ok(None)
            }
        }
    }

    fn is_idle(&self) -> bool {
        self.config.idle_timeout_ms > 0
            && self.last_activity.elapsed() > Duration::from_millis(self.config.idle_timeout_ms)
    }

    /// 상태 머신 한 틱
    ///
    /// 종료 상태에 도달하면 결과 반환
    pub async fn step(&mut self, inbound: Option<Packet>) -> Result<Option<TransferOutcome>> {
        // 모든 블록을 받은 뒤의 BYE는 저장을 막지 않음
        let peer_quit = matches!(inbound, Some(Packet::Bye));
        if peer_quit && self.state != ReceiverState::TransferSuccessful {
            info!("The sender quit on us, canceling the transfer.");
            self.reset();
            return Ok(Some(TransferOutcome::PeerAborted));
        }

        match self.state {
            ReceiverState::RequestingFile => {
                if self.attempts >= self.config.max_request_attempts {
                    return Err(Error::FileRejected {
                        filename: self.filename.clone(),
                        attempts: self.attempts,
                    });
                }
                self.attempts += 1;

                self.send(Packet::request_file(self.filename.clone())).await;
                self.state = ReceiverState::WaitingForRequestFileAck;
            }

            ReceiverState::WaitingForRequestFileAck => {
                if let Some(Packet::Ack { message }) = inbound {
                    if message == self.filename {
                        info!("They have the file, waiting for INFO...");
                        self.state = ReceiverState::WaitingForInfo;
                    } else {
                        let mismatch = Error::ProtocolMismatch {
                            expected: self.filename.clone(),
                            got: message,
                        };
                        warn!("파일 요청 거부됨, 다시 요청: {}", mismatch);
                        self.restart();
                    }
                }
            }

            ReceiverState::WaitingForInfo => {
                if let Some(Packet::Info(info)) = inbound {
                    self.handle_info(info).await;
                }
            }

            ReceiverState::PreparingForTransfer => {
                self.transfer.tracker.seed(self.transfer.block_count);
                self.transfer.stats.start();

                info!("Starting Transfer...");
                self.state = ReceiverState::Transferring;
            }

            ReceiverState::Transferring => {
                self.transfer_tick(inbound).await;
            }

            ReceiverState::TransferSuccessful => {
                return self.finish().await.map(Some);
            }
        }

        Ok(None)
    }

    async fn handle_info(&mut self, info: InfoPacket) {
        info!("Received an INFO packet:");
        info!("  Max block size: {}", info.max_block_size);
        info!("  Num blocks: {}", info.block_count);
        info!("  File size: {} bytes", info.file_size);

        if let Err(e) = check_info(&info) {
            warn!("INFO 거부, 다시 요청: {}", e);
            self.restart();
            return;
        }

        self.transfer.digest = Some(info.digest);
        self.transfer.file_size = info.file_size;
        self.transfer.block_count = info.block_count;

        self.send(Packet::ack(INFO_ACK_MESSAGE)).await;
        self.state = ReceiverState::PreparingForTransfer;
    }

    async fn transfer_tick(&mut self, inbound: Option<Packet>) {
        // 틱마다 요청 하나
        if let Some(number) = self.transfer.tracker.next_request() {
            self.send(Packet::request_block(number)).await;
            self.transfer.stats.requests += 1;
            debug!("Sent request for block #{}", number);
        }

        if let Some(Packet::Send(block)) = inbound {
            self.accept_block(block);
        }

        let requeued = self.transfer.tracker.requeue_missing();
        if requeued > 0 {
            debug!("누락 블록 {}개 재요청 예약", requeued);
            self.transfer.stats.requeued += requeued as u64;
        }

        if self.transfer.tracker.is_complete() {
            self.state = ReceiverState::TransferSuccessful;
        }
    }

    fn accept_block(&mut self, block: Block) {
        let number = block.number;
        let len = block.data.len();

        match self.transfer.tracker.insert(block) {
            Insertion::Accepted => {
                self.transfer.stats.blocks += 1;
                self.transfer.stats.bytes += len as u64;
                debug!("Received block #{} [{} bytes]", number, len);
            }
            Insertion::Duplicate => {
                self.transfer.stats.duplicates += 1;
                debug!("중복 블록 #{} 무시", number);
            }
            Insertion::OutOfRange => {
                self.transfer.stats.out_of_range += 1;
                warn!(
                    "범위 밖 블록 #{} 무시 (1..={})",
                    number, self.transfer.block_count
                );
            }
        }
    }

    /// BYE 전송, 조립, 압축 해제, 검증, 저장
    async fn finish(&mut self) -> Result<TransferOutcome> {
        self.transfer.stats.stop();
        self.send(Packet::Bye).await;

        let stats = self.transfer.stats.clone();
        let tracker = &self.transfer.tracker;
        info!(
            "Transfer successful; it took {:.3}s with a success ratio of {:.3}.",
            stats.elapsed().as_secs_f64(),
            tracker.success_ratio()
        );
        debug!("{}", stats.summary());

        let compressed = tracker.reassemble();
        let result = self.verify_and_persist(&compressed);

        let outcome = result.map(|bytes_written| {
            info!("Saved file as {:?}", self.destination);
            TransferOutcome::Completed(TransferReport {
                filename: self.filename.clone(),
                destination: self.destination.clone(),
                bytes_written,
                compressed_size: compressed.len(),
                block_count: self.transfer.block_count,
                requests: self.transfer.tracker.total_requested(),
                duplicates: stats.duplicates,
                elapsed: stats.elapsed(),
            })
        });

        if let Err(e) = &outcome {
            warn!("Could not save the blocks to {:?}: {}", self.destination, e);
        }

        self.reset();
        outcome
    }

    fn verify_and_persist(&self, compressed: &[u8]) -> Result<usize> {
        let data = self.compressor.decompress(compressed)?;

        let expected = self.transfer.digest.unwrap_or_default();
        let actual = self.digester.digest(&data);
        if actual != expected {
            return Err(Error::ChecksumMismatch {
                expected: to_hex(&expected),
                got: to_hex(&actual),
            });
        }

        if data.len() != self.transfer.file_size as usize {
            warn!(
                "파일 크기 불일치: INFO {} bytes, 실제 {} bytes",
                self.transfer.file_size,
                data.len()
            );
        }

        self.store.write(&self.destination, &data)?;
        Ok(data.len())
    }

    /// 거부/불일치: 시도 상태를 비우고 처음부터 다시 요청
    fn restart(&mut self) {
        self.transfer.reset();
        self.state = ReceiverState::RequestingFile;
    }

    /// 전체 초기화 (다운로드 종료 시)
    fn reset(&mut self) {
        self.restart();
        self.attempts = 0;
    }

    async fn send(&self, packet: Packet) {
        if let Err(e) = self
            .transport
            .send_to(&packet.to_bytes(), self.server_addr)
            .await
        {
            warn!("{} 전송 실패: {}", packet.kind(), e);
        }
    }
}

/// INFO 값이 서로 맞는지 확인
///
/// 블록 수는 deflate 최악 팽창을 감안한 상한과 `MAX_BLOCK_COUNT`를 넘을 수 없음.
/// 압축 스트림은 비어 있을 수 없으므로 블록이 최소 하나는 있어야 함
fn check_info(info: &InfoPacket) -> Result<()> {
    let mismatch = |expected: String| Error::ProtocolMismatch {
        expected,
        got: format!(
            "max_block_size={}, block_count={}, file_size={}",
            info.max_block_size, info.block_count, info.file_size
        ),
    };

    if info.max_block_size == 0 || info.max_block_size as usize > MAX_DATAGRAM_SIZE {
        return Err(mismatch(format!("max_block_size 1..={}", MAX_DATAGRAM_SIZE)));
    }

    // 고정 허프만 블록의 최악 팽창(9/8)보다 넉넉한 상한
    let file_size = info.file_size as u64;
    let max_compressed = file_size + (file_size >> 3) + 1024;
    let block_size = info.max_block_size as u64;
    let max_blocks = ((max_compressed + block_size - 1) / block_size).min(MAX_BLOCK_COUNT as u64);

    if info.block_count == 0 || info.block_count as u64 > max_blocks {
        return Err(mismatch(format!("block_count 1..={}", max_blocks)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockBuilder;
    use crate::packet::PacketKind;
    use crate::store::MemoryStore;
    use crate::transport::{MemoryNetwork, MemoryTransport};

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    /// 압축되지 않는 테스트 데이터
    fn random_bytes(len: usize) -> Vec<u8> {
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::StdRng::seed_from_u64(len as u64);
        let mut data = vec![0u8; len];
        rng.fill(&mut data[..]);
        data
    }

    struct Fixture {
        receiver: Receiver<MemoryTransport>,
        store: Arc<MemoryStore>,
        info: InfoPacket,
        blocks: Vec<Block>,
    }

    fn fixture(content: &[u8], max_block_size: usize) -> Fixture {
        let (local, _server) = MemoryNetwork::pair(addr(5000), addr(6000));
        let store = Arc::new(MemoryStore::new());
        let config = Config::default().with_max_block_size(max_block_size);
        let receiver = Receiver::new(local, addr(6000), config)
            .unwrap()
            .with_store(store.clone());

        let compressed = DeflateCompressor::default().compress(content).unwrap();
        let blocks = BlockBuilder::new(max_block_size).split_into_blocks(&compressed);
        let info = InfoPacket {
            digest: Md5Digester.digest(content),
            file_size: content.len() as u32,
            max_block_size: max_block_size as u32,
            block_count: blocks.len() as u32,
        };

        Fixture {
            receiver,
            store,
            info,
            blocks,
        }
    }

    fn sent_kinds(receiver: &Receiver<MemoryTransport>) -> Vec<PacketKind> {
        receiver
            .transport()
            .sent()
            .iter()
            .map(|(bytes, _)| Packet::from_bytes(bytes).unwrap().kind())
            .collect()
    }

    /// INFO까지 진행시키고 전송 단계 진입
    async fn drive_to_transfer(f: &mut Fixture) {
        let r = &mut f.receiver;
        r.begin("a.txt", "out.txt");

        assert!(r.step(None).await.unwrap().is_none());
        assert_eq!(r.state(), ReceiverState::WaitingForRequestFileAck);

        r.step(Some(Packet::ack("a.txt"))).await.unwrap();
        assert_eq!(r.state(), ReceiverState::WaitingForInfo);

        r.step(Some(Packet::Info(f.info))).await.unwrap();
        assert_eq!(r.state(), ReceiverState::PreparingForTransfer);

        r.step(None).await.unwrap();
        assert_eq!(r.state(), ReceiverState::Transferring);
        assert_eq!(r.tracker().pending_requests(), f.info.block_count as usize);
    }

    #[tokio::test]
    async fn test_legal_sequence_in_any_order_completes() {
        let content = random_bytes(20_000);
        let mut f = fixture(&content, 512);
        assert!(f.blocks.len() > 3);
        drive_to_transfer(&mut f).await;

        // 역순으로 도착
        let mut outcome = None;
        for block in f.blocks.iter().rev() {
            outcome = f.receiver.step(Some(Packet::Send(block.clone()))).await.unwrap();
            assert!(outcome.is_none());
        }
        assert_eq!(f.receiver.state(), ReceiverState::TransferSuccessful);

        while outcome.is_none() {
            outcome = f.receiver.step(None).await.unwrap();
        }

        match outcome.unwrap() {
            TransferOutcome::Completed(report) => {
                assert_eq!(report.bytes_written, content.len());
                assert_eq!(report.block_count, f.blocks.len() as u32);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(f.store.written(Path::new("out.txt")).unwrap(), content);
        assert_eq!(f.receiver.state(), ReceiverState::RequestingFile);

        let kinds = sent_kinds(&f.receiver);
        assert_eq!(kinds[0], PacketKind::RequestFile);
        assert_eq!(kinds[1], PacketKind::Ack);
        assert_eq!(*kinds.last().unwrap(), PacketKind::Bye);
    }

    #[tokio::test]
    async fn test_checksum_mismatch_writes_nothing() {
        let mut f = fixture(b"hello world", 8192);
        f.info.digest = [0u8; 16];
        drive_to_transfer(&mut f).await;

        let mut result = f.receiver.step(Some(Packet::Send(f.blocks[0].clone()))).await;
        while matches!(result, Ok(None)) {
            result = f.receiver.step(None).await;
        }

        assert!(matches!(result, Err(Error::ChecksumMismatch { .. })));
        assert_eq!(f.store.written_count(), 0);
    }

    #[tokio::test]
    async fn test_mismatched_ack_restarts_request() {
        let mut f = fixture(b"hello world", 8192);
        let r = &mut f.receiver;
        r.begin("a.txt", "out.txt");

        r.step(None).await.unwrap();
        r.step(Some(Packet::ack("b.txt"))).await.unwrap();
        assert_eq!(r.state(), ReceiverState::RequestingFile);

        // 관계없는 패킷은 대기
        r.step(None).await.unwrap();
        r.step(Some(Packet::request_block(1))).await.unwrap();
        assert_eq!(r.state(), ReceiverState::WaitingForRequestFileAck);

        assert_eq!(
            sent_kinds(r),
            vec![PacketKind::RequestFile, PacketKind::RequestFile]
        );
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let mut f = fixture(b"hello world", 8192);
        let r = &mut f.receiver;
        r.begin("missing.txt", "out.txt");

        let mut result = Ok(None);
        for _ in 0..20 {
            result = r.step(None).await;
            if result.is_err() {
                break;
            }
            // 송신자의 거부 응답 (빈 메시지)
            result = r.step(Some(Packet::ack(""))).await;
        }

        assert!(matches!(
            result,
            Err(Error::FileRejected { attempts: 5, .. })
        ));
    }

    #[tokio::test]
    async fn test_peer_bye_aborts_from_any_state() {
        let mut f = fixture(b"hello world", 8192);
        drive_to_transfer(&mut f).await;

        let outcome = f.receiver.step(Some(Packet::Bye)).await.unwrap();
        assert!(matches!(outcome, Some(TransferOutcome::PeerAborted)));
        assert_eq!(f.receiver.state(), ReceiverState::RequestingFile);
        assert_eq!(f.receiver.tracker().block_count(), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_and_duplicate_blocks_ignored() {
        let content = random_bytes(5000);
        let mut f = fixture(&content, 512);
        drive_to_transfer(&mut f).await;
        let count = f.info.block_count;

        let stray = Block::new(count + 1, bytes::Bytes::from_static(b"junk"));
        f.receiver.step(Some(Packet::Send(stray))).await.unwrap();
        f.receiver
            .step(Some(Packet::Send(f.blocks[0].clone())))
            .await
            .unwrap();
        f.receiver
            .step(Some(Packet::Send(f.blocks[0].clone())))
            .await
            .unwrap();

        assert_eq!(f.receiver.tracker().received_count(), 1);
        assert_eq!(f.receiver.transfer.stats.duplicates, 1);
        assert_eq!(f.receiver.transfer.stats.out_of_range, 1);
    }

    #[tokio::test]
    async fn test_zero_block_info_restarts() {
        let mut f = fixture(b"hello world", 8192);
        let r = &mut f.receiver;
        r.begin("a.txt", "out.txt");
        r.step(None).await.unwrap();
        r.step(Some(Packet::ack("a.txt"))).await.unwrap();

        let mut info = f.info;
        info.block_count = 0;
        r.step(Some(Packet::Info(info))).await.unwrap();
        assert_eq!(r.state(), ReceiverState::RequestingFile);
    }

    #[tokio::test]
    async fn test_bye_after_last_block_still_saves() {
        let mut f = fixture(b"hello world", 8192);
        drive_to_transfer(&mut f).await;

        f.receiver
            .step(Some(Packet::Send(f.blocks[0].clone())))
            .await
            .unwrap();
        assert_eq!(f.receiver.state(), ReceiverState::TransferSuccessful);

        // 송신자가 마지막 SEND 직후 종료
        let outcome = f.receiver.step(Some(Packet::Bye)).await.unwrap();
        assert!(matches!(outcome, Some(TransferOutcome::Completed(_))));
        assert_eq!(
            f.store.written(Path::new("out.txt")).unwrap(),
            b"hello world"
        );
    }

    async fn step_with_info(f: &mut Fixture, info: InfoPacket) -> ReceiverState {
        let r = &mut f.receiver;
        r.begin("a.txt", "out.txt");
        r.step(None).await.unwrap();
        r.step(Some(Packet::ack("a.txt"))).await.unwrap();
        r.step(Some(Packet::Info(info))).await.unwrap();
        r.state()
    }

    #[tokio::test]
    async fn test_implausible_info_restarts() {
        let mut f = fixture(b"hello world", 8192);

        let mut huge = f.info;
        huge.block_count = u32::MAX;
        assert_eq!(step_with_info(&mut f, huge).await, ReceiverState::RequestingFile);

        let mut zero_size = f.info;
        zero_size.max_block_size = 0;
        assert_eq!(
            step_with_info(&mut f, zero_size).await,
            ReceiverState::RequestingFile
        );

        // 최대 크기 파일이라도 블록 수 상한을 넘으면 거부
        let capped = InfoPacket {
            file_size: u32::MAX,
            max_block_size: 1,
            block_count: MAX_BLOCK_COUNT + 1,
            ..f.info
        };
        assert_eq!(step_with_info(&mut f, capped).await, ReceiverState::RequestingFile);

        assert_eq!(f.receiver.tracker().pending_requests(), 0);
        // INFO 확인 ACK는 한 번도 보내지 않음
        assert!(!sent_kinds(&f.receiver).contains(&PacketKind::Ack));
    }

    #[test]
    fn test_check_info_accepts_real_transfers() {
        let f = fixture(&random_bytes(20_000), 512);
        assert!(check_info(&f.info).is_ok());

        let f = fixture(b"", 8192);
        assert!(check_info(&f.info).is_ok());

        let mut info = f.info;
        info.block_count = 2;
        assert!(matches!(
            check_info(&info),
            Err(Error::ProtocolMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancel_sends_bye() {
        let mut f = fixture(b"hello world", 8192);
        let shutdown = Shutdown::new();
        shutdown.trigger();

        let outcome = f
            .receiver
            .get_file("a.txt", "out.txt", &shutdown)
            .await
            .unwrap();

        assert!(matches!(outcome, TransferOutcome::UserCanceled));
        assert_eq!(
            sent_kinds(&f.receiver),
            vec![PacketKind::RequestFile, PacketKind::Bye]
        );
    }

    #[tokio::test]
    async fn test_idle_timeout() {
        let (local, _server) = MemoryNetwork::pair(addr(5000), addr(6000));
        let config = Config::default().with_idle_timeout_ms(20);
        let mut receiver = Receiver::new(local, addr(6000), config).unwrap();

        let result = receiver
            .get_file("a.txt", "out.txt", &Shutdown::new())
            .await;
        assert!(matches!(result, Err(Error::IdleTimeout { idle_ms: 20 })));
    }
}
