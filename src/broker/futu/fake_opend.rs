//! 測試用的 OpenD，InitConnect 與 KeepAlive 自動回應，其餘交給 handler

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::{net::TcpListener, task::JoinHandle};

use super::{
    frame::{self, Frame},
    proto,
};

pub struct FakeOpenD {
    pub port: u16,
    task: JoinHandle<()>,
}

impl FakeOpenD {
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(u32, &Value) -> Value + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handler = Arc::new(handler);

        let task = tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let handler = handler.clone();
                tokio::spawn(async move {
                    while let Ok(req) = frame::read_frame(&mut socket).await {
                        let body: Value = serde_json::from_slice(&req.body).unwrap();
                        let reply = match req.header.proto_id {
                            proto::INIT_CONNECT => json!({"retType": 0, "s2c": {
                                "serverVer": 904, "loginUserID": "10001",
                                "connID": "7204", "keepAliveInterval": 10
                            }}),
                            proto::KEEP_ALIVE => json!({"retType": 0, "s2c": body["c2s"].clone()}),
                            proto_id => handler(proto_id, &body),
                        };

                        let out = Frame::json(
                            req.header.proto_id,
                            req.header.serial_no,
                            serde_json::to_vec(&reply).unwrap(),
                        );
                        if frame::write_frame(&mut socket, &out).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });

        FakeOpenD { port, task }
    }
}

impl Drop for FakeOpenD {
    fn drop(&mut self) {
        self.task.abort();
    }
}
