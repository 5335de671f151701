//! 파일 무결성 검증용 다이제스트
//!
//! 원본(압축 전) 파일 바이트의 16바이트 지문

/// 다이제스트 길이 (바이트)
pub const DIGEST_LEN: usize = 16;

/// 16바이트 다이제스트
pub type Digest = [u8; DIGEST_LEN];

/// 다이제스트 계산기
pub trait Digester: Send + Sync {
    fn digest(&self, data: &[u8]) -> Digest;
}

/// MD5 다이제스트 (기본값, 기존 구현과 호환)
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5Digester;

impl Digester for Md5Digester {
    fn digest(&self, data: &[u8]) -> Digest {
        use md5::Digest as _;

        let mut out = [0u8; DIGEST_LEN];
        out.copy_from_slice(&md5::Md5::digest(data));
        out
    }
}

/// BLAKE3 확장 출력을 16바이트로 자른 다이제스트
///
/// 양쪽 모두 이 구현을 쓸 때만 호환됨
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Digester;

impl Digester for Blake3Digester {
    fn digest(&self, data: &[u8]) -> Digest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(data);

        let mut out = [0u8; DIGEST_LEN];
        hasher.finalize_xof().fill(&mut out);
        out
    }
}

/// 로그 출력용 16진수 문자열
pub fn to_hex(digest: &[u8]) -> String {
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_md5_known_answer() {
        let digest = Md5Digester.digest(b"hello world");
        assert_eq!(to_hex(&digest), "5eb63bbbe01eeed093cb22bb8f5acdc3");

        assert_eq!(
            to_hex(&Md5Digester.digest(b"")),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn test_blake3_is_stable_and_sensitive() {
        let digester = Blake3Digester;
        let a = digester.digest(b"hello world");
        let b = digester.digest(b"hello world");
        let c = digester.digest(b"hello world!");

        assert_eq!(a, b);
        assert_ne!(a, c);
        // XOF 앞부분은 기본 32바이트 해시의 앞부분과 같음
        assert_eq!(&a[..], &blake3::hash(b"hello world").as_bytes()[..DIGEST_LEN]);
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex(&[0x00, 0xab, 0x10]), "00ab10");
    }
}
