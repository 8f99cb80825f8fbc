use std::{
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::Local;
use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    io::AsyncWriteExt,
    net::TcpStream,
    sync::Mutex,
    task::JoinHandle,
    time,
};

use super::{
    error::{FutuError, FutuResult},
    frame::{self, Frame},
    proto::{self, Empty, InitConnectC2S, InitConnectS2C, KeepAlive, Request, Response},
};
use crate::logging;

/// 與 OpenD 的一條連線，請求依序送出並以序號對應回應
pub struct Connection {
    inner: Arc<Inner>,
    keep_alive: Option<JoinHandle<()>>,
    pub conn_id: u64,
    pub login_user_id: u64,
}

struct Inner {
    addr: String,
    stream: Mutex<TcpStream>,
    serial_no: AtomicU32,
    timeout: Duration,
    broken: AtomicBool,
}

impl Connection {
    /// 建立 TCP 連線並完成 InitConnect
    pub async fn connect(
        host: &str,
        port: u16,
        client_id: &str,
        timeout: Duration,
    ) -> FutuResult<Self> {
        let addr = format!("{}:{}", host, port);
        let stream = time::timeout(timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| FutuError::Timeout {
                proto_id: proto::INIT_CONNECT,
            })??;
        stream.set_nodelay(true)?;

        let inner = Arc::new(Inner {
            addr,
            stream: Mutex::new(stream),
            serial_no: AtomicU32::new(0),
            timeout,
            broken: AtomicBool::new(false),
        });

        let s2c: InitConnectS2C = inner
            .request(proto::INIT_CONNECT, &InitConnectC2S::new(client_id))
            .await?;
        let conn_id = s2c.conn_id.unwrap_or_default();
        let login_user_id = s2c.login_user_id.unwrap_or_default();
        let interval = s2c.keep_alive_interval.unwrap_or(10).max(1) as u64;

        logging::info_file_async(format!(
            "成功連接到 OpenD {} connID={} serverVer={:?} keepAlive={}s",
            inner.addr, conn_id, s2c.server_ver, interval
        ));

        let keep_alive = spawn_keep_alive(&inner, Duration::from_secs(interval));

        Ok(Connection {
            inner,
            keep_alive: Some(keep_alive),
            conn_id,
            login_user_id,
        })
    }

    /// 送出請求並取回 s2c
    pub async fn request<REQ, RES>(&self, proto_id: u32, c2s: &REQ) -> FutuResult<RES>
    where
        REQ: Serialize,
        RES: DeserializeOwned,
    {
        self.inner.request(proto_id, c2s).await
    }

    /// 送出請求，只關心是否成功
    pub async fn send<REQ: Serialize>(&self, proto_id: u32, c2s: &REQ) -> FutuResult<()> {
        self.inner.call::<REQ, Empty>(proto_id, c2s).await.map(|_| ())
    }

    pub async fn close(&mut self) {
        if let Some(handle) = self.keep_alive.take() {
            handle.abort();
        }

        self.inner.broken.store(true, Ordering::SeqCst);
        let mut stream = self.inner.stream.lock().await;
        if let Err(why) = stream.shutdown().await {
            logging::debug_file_async(format!(
                "Failed to shutdown OpenD {} because {:?}",
                self.inner.addr, why
            ));
        }

        logging::info_file_async(format!(
            "已關閉 OpenD 連線 {} connID={}",
            self.inner.addr, self.conn_id
        ));
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(handle) = self.keep_alive.take() {
            handle.abort();
        }
    }
}

fn spawn_keep_alive(inner: &Arc<Inner>, interval: Duration) -> JoinHandle<()> {
    let weak = Arc::downgrade(inner);

    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        // 第一次 tick 立即完成
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let Some(inner) = weak.upgrade() else {
                break;
            };

            if inner.broken.load(Ordering::SeqCst) {
                break;
            }

            let req = KeepAlive {
                time: Local::now().timestamp(),
            };
            if let Err(why) = inner.request::<_, KeepAlive>(proto::KEEP_ALIVE, &req).await {
                logging::warn_file_async(format!(
                    "KeepAlive to OpenD {} failed because {:?}",
                    inner.addr, why
                ));
            }
        }
    })
}

impl Inner {
    async fn request<REQ, RES>(&self, proto_id: u32, c2s: &REQ) -> FutuResult<RES>
    where
        REQ: Serialize,
        RES: DeserializeOwned,
    {
        self.call(proto_id, c2s)
            .await?
            .ok_or(FutuError::MissingBody { proto_id })
    }

    async fn call<REQ, RES>(&self, proto_id: u32, c2s: &REQ) -> FutuResult<Option<RES>>
    where
        REQ: Serialize,
        RES: DeserializeOwned,
    {
        let body = serde_json::to_vec(&Request { c2s })?;
        let serial_no = self.serial_no.fetch_add(1, Ordering::SeqCst) + 1;
        let request = Frame::json(proto_id, serial_no, body);

        let reply = self.exchange(&request).await?;
        let response: Response<RES> = serde_json::from_slice(&reply.body)?;

        if response.ret_type != 0 {
            return Err(FutuError::Gateway {
                proto_id,
                ret_type: response.ret_type,
                err_code: response.err_code.unwrap_or_default(),
                msg: response.ret_msg.unwrap_or_default(),
            });
        }

        Ok(response.s2c)
    }

    async fn exchange(&self, request: &Frame) -> FutuResult<Frame> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(FutuError::Disconnected);
        }

        let proto_id = request.header.proto_id;
        let serial_no = request.header.serial_no;
        let mut stream = self.stream.lock().await;

        let result = time::timeout(self.timeout, async {
            frame::write_frame(&mut *stream, request).await?;
            loop {
                let reply = frame::read_frame(&mut *stream).await?;
                if reply.header.proto_id == proto_id && reply.header.serial_no == serial_no {
                    return Ok::<Frame, FutuError>(reply);
                }

                logging::debug_file_async(format!(
                    "略過非預期的封包 proto_id={} serial_no={}，等待 proto_id={} serial_no={}",
                    reply.header.proto_id, reply.header.serial_no, proto_id, serial_no
                ));
            }
        })
        .await;

        match result {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(why)) => {
                // 讀寫失敗後串流位置已不可信
                self.broken.store(true, Ordering::SeqCst);
                Err(why)
            }
            Err(_) => {
                self.broken.store(true, Ordering::SeqCst);
                Err(FutuError::Timeout { proto_id })
            }
        }
    }
}
