// Copyright 2024 broker-client contributors
// SPDX-License-Identifier: Apache-2.0

//! Arms a single `RequestController` with a command against an in-memory
//! transport and topology, drives it to completion, and prints the result.

use broker_client::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
struct PutOrder {
    topic: String,
    partition: i32,
}

impl Command for PutOrder {
    fn topic(&self) -> &str {
        &self.topic
    }
    fn partition(&self) -> i32 {
        self.partition
    }
    fn template_id(&self) -> u16 {
        42
    }
    fn schema_id(&self) -> u16 {
        1
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Ack {
    accepted: bool,
}
broker_client::impl_decoded_response!(Ack);

#[derive(Debug)]
struct PassthroughMapper;
impl ObjectMapper for PassthroughMapper {
    fn encode(&self, _command: &dyn Command) -> Vec<u8> {
        Vec::new()
    }
    fn decode(&self, _command: &dyn Command, _bytes: &[u8]) -> anyhow::Result<Box<dyn DecodedResponse>> {
        Ok(Box::new(Ack { accepted: true }))
    }
}

#[derive(Debug)]
struct InMemoryTransport;

struct ImmediateResponse(Option<Vec<u8>>);
impl PendingResponse for ImmediateResponse {
    fn is_ready(&self) -> bool {
        true
    }
    fn take(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.0.take())
    }
    fn release(&mut self) {}
}

impl Transport for InMemoryTransport {
    fn send(&self, _endpoint: Endpoint, _payload: Vec<u8>) -> Option<Box<dyn PendingResponse>> {
        let mut bytes = Vec::new();
        encode_header(
            &Header {
                block_length: 0,
                template_id: 42,
                schema_id: 1,
                version: 1,
            },
            &mut bytes,
        );
        Some(Box::new(ImmediateResponse(Some(bytes))))
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let topology = CachedTopologyView::new(|| async { Ok(Snapshot::default()) });
    let mut snapshot = Snapshot::default();
    snapshot
        .partitions
        .insert(("orders".to_string(), 0), Endpoint("127.0.0.1:9042".parse().unwrap()));
    topology.seed(snapshot);

    let released = Arc::new(AtomicBool::new(false));
    struct PrintRelease(Arc<AtomicBool>);
    impl ReleaseHandle for PrintRelease {
        fn release(&self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    let mut controller = RequestController::new(
        Arc::new(topology),
        Arc::new(InMemoryTransport),
        Arc::new(SystemClock),
        Duration::from_millis(5_000),
        Arc::new(PrintRelease(Arc::clone(&released))),
    );

    let (sink, receiver) = OneshotSink::<Ack>::channel();
    controller
        .configure_command(
            Arc::new(PutOrder {
                topic: "orders".to_string(),
                partition: 0,
            }),
            Arc::new(PassthroughMapper),
            Box::new(sink),
        )
        .expect("controller starts unarmed");

    while !controller.is_closed() {
        controller.step();
    }

    match receiver.await.expect("sink completed before being dropped") {
        Ok(ack) => println!("order accepted: {}", ack.accepted),
        Err(error) => println!("order failed: {}", error),
    }
    println!("released: {}", released.load(Ordering::SeqCst));
}
