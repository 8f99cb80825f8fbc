//! OpenD 封包：44 bytes 的小端序表頭加上內容
//!
//! | 欄位       | 長度 |
//! |------------|------|
//! | "FT"       | 2    |
//! | proto id   | 4    |
//! | 格式       | 1    |
//! | 協議版本   | 1    |
//! | 序號       | 4    |
//! | 內容長度   | 4    |
//! | 內容 SHA1  | 20   |
//! | 保留       | 8    |

use sha1::{Digest, Sha1};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::error::{FutuError, FutuResult};

pub const HEADER_LEN: usize = 44;
pub const HEADER_FLAG: [u8; 2] = *b"FT";
/// 內容使用 JSON 編碼
pub const FMT_JSON: u8 = 1;
pub const PROTO_VER: u8 = 0;
pub const MAX_BODY_LEN: u32 = 64 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub proto_id: u32,
    pub fmt_type: u8,
    pub proto_ver: u8,
    pub serial_no: u32,
    pub body_len: u32,
    pub body_sha1: [u8; 20],
}

impl FrameHeader {
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..2].copy_from_slice(&HEADER_FLAG);
        buf[2..6].copy_from_slice(&self.proto_id.to_le_bytes());
        buf[6] = self.fmt_type;
        buf[7] = self.proto_ver;
        buf[8..12].copy_from_slice(&self.serial_no.to_le_bytes());
        buf[12..16].copy_from_slice(&self.body_len.to_le_bytes());
        buf[16..36].copy_from_slice(&self.body_sha1);
        buf
    }

    pub fn decode(buf: &[u8; HEADER_LEN]) -> FutuResult<Self> {
        if buf[0..2] != HEADER_FLAG {
            return Err(FutuError::Frame(format!(
                "bad header flag {}",
                hex::encode(&buf[0..2])
            )));
        }

        let body_len = u32_le(&buf[12..16]);
        if body_len > MAX_BODY_LEN {
            return Err(FutuError::Frame(format!("body too large: {}", body_len)));
        }

        let mut body_sha1 = [0u8; 20];
        body_sha1.copy_from_slice(&buf[16..36]);

        Ok(FrameHeader {
            proto_id: u32_le(&buf[2..6]),
            fmt_type: buf[6],
            proto_ver: buf[7],
            serial_no: u32_le(&buf[8..12]),
            body_len,
            body_sha1,
        })
    }
}

fn u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn sha1_of(body: &[u8]) -> [u8; 20] {
    let mut out = [0u8; 20];
    out.copy_from_slice(&Sha1::digest(body));
    out
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub header: FrameHeader,
    pub body: Vec<u8>,
}

impl Frame {
    pub fn json(proto_id: u32, serial_no: u32, body: Vec<u8>) -> Self {
        Frame {
            header: FrameHeader {
                proto_id,
                fmt_type: FMT_JSON,
                proto_ver: PROTO_VER,
                serial_no,
                body_len: body.len() as u32,
                body_sha1: sha1_of(&body),
            },
            body,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.body.len());
        buf.extend_from_slice(&self.header.encode());
        buf.extend_from_slice(&self.body);
        buf
    }

    fn verify(&self) -> FutuResult<()> {
        let actual = sha1_of(&self.body);
        if actual != self.header.body_sha1 {
            return Err(FutuError::Frame(format!(
                "body sha1 mismatch for proto {}: expected {} got {}",
                self.header.proto_id,
                hex::encode(self.header.body_sha1),
                hex::encode(actual)
            )));
        }

        if self.header.fmt_type != FMT_JSON {
            return Err(FutuError::Frame(format!(
                "unsupported body format {} for proto {}",
                self.header.fmt_type, self.header.proto_id
            )));
        }

        Ok(())
    }
}

pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &Frame) -> FutuResult<()> {
    writer.write_all(&frame.encode()).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> FutuResult<Frame> {
    let mut head = [0u8; HEADER_LEN];
    read_exact_or_closed(reader, &mut head).await?;
    let header = FrameHeader::decode(&head)?;

    let mut body = vec![0u8; header.body_len as usize];
    read_exact_or_closed(reader, &mut body).await?;

    let frame = Frame { header, body };
    frame.verify()?;
    Ok(frame)
}

async fn read_exact_or_closed<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> FutuResult<()> {
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(why) if why.kind() == std::io::ErrorKind::UnexpectedEof => Err(FutuError::Disconnected),
        Err(why) => Err(FutuError::Io(why)),
    }
}
