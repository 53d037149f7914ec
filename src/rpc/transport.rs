//! UDP listener: one datagram in, one datagram out.
//!
//! Runs on a dedicated thread with an `edge-executor` driving a single
//! serve loop over an `async-io-mini` socket.  The loop races every
//! receive against a stop signal, so [`ListenerHandle::stop`] takes effect
//! without waiting for another datagram to arrive.
//!
//! ```text
//!  ┌──────────────────────────────────────────────────────────┐
//!  │  udp-listener thread                                     │
//!  │  futures_lite::block_on(LocalExecutor::run(              │
//!  │      or( serve_loop ─▶ recv_from ─▶ rate limit           │
//!  │                       ─▶ CommandEngine ─▶ send_to,       │
//!  │          STOP.wait() )))                                 │
//!  └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Excess datagrams beyond the configured rate are dropped without a
//! reply.  Receive and send failures are logged and the loop continues.

use core::time::Duration;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::thread::JoinHandle;

use async_io_mini::Async;
use burster::Limiter;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::{debug, error, info, warn};

use crate::app::ports::ControlPort;
use crate::config::ServerConfig;
use crate::error::Result;

use super::engine::CommandEngine;

type StopSignal = Signal<CriticalSectionRawMutex, ()>;
type RateLimiter = burster::TokenBucket<fn() -> Duration>;

// ── Handle ───────────────────────────────────────────────────

/// Owner-side handle of a running listener.
pub struct ListenerHandle {
    local_addr: SocketAddr,
    stop: Arc<StopSignal>,
    thread: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    /// Address the socket is actually bound to (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Ask the serve loop to exit and wait for its thread.
    pub fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.stop.signal(());
        if thread.join().is_err() {
            error!("UDP listener thread panicked");
        }
        info!("UDP listener stopped");
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Spawn ────────────────────────────────────────────────────

/// Bind the socket and start serving on a new thread.
///
/// Binding happens on the caller's thread so address errors surface here.
pub fn spawn<C>(config: &ServerConfig, engine: CommandEngine<C>) -> Result<ListenerHandle>
where
    C: ControlPort + Send + 'static,
{
    let socket = UdpSocket::bind((config.host.as_str(), config.port))?;
    let local_addr = socket.local_addr()?;
    let socket = Async::new(socket)?;

    let stop = Arc::new(StopSignal::new());
    let thread_stop = stop.clone();
    let max_datagram = config.max_datagram;
    let rate = config.rate_limit_per_sec;

    let thread = std::thread::Builder::new()
        .name("udp-listener".into())
        .spawn(move || {
            let limiter: RateLimiter = burster::TokenBucket::new_with_time_provider(
                rate,
                rate, // burst capacity equals the per-second rate
                monotonic_now as fn() -> Duration,
            );
            run_serve_loop(&socket, &engine, limiter, max_datagram, &thread_stop);
        })?;

    info!("UDP listener on {}", local_addr);
    Ok(ListenerHandle {
        local_addr,
        stop,
        thread: Some(thread),
    })
}

fn run_serve_loop<C: ControlPort>(
    socket: &Async<UdpSocket>,
    engine: &CommandEngine<C>,
    limiter: RateLimiter,
    max_datagram: usize,
    stop: &StopSignal,
) {
    let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();
    futures_lite::future::block_on(executor.run(futures_lite::future::or(
        serve_loop(socket, engine, limiter, max_datagram),
        stop.wait(),
    )));
}

async fn serve_loop<C: ControlPort>(
    socket: &Async<UdpSocket>,
    engine: &CommandEngine<C>,
    mut limiter: RateLimiter,
    max_datagram: usize,
) {
    let mut buf = vec![0u8; max_datagram];
    loop {
        let (len, peer) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                warn!("UDP receive failed: {}", e);
                continue;
            }
        };
        if limiter.try_consume(1).is_err() {
            warn!("Rate limit exceeded, dropping datagram from {}", peer);
            continue;
        }

        debug!("{} bytes from {}", len, peer);
        let reply = engine.handle_datagram(&buf[..len]);
        if let Err(e) = socket.send_to(reply.as_bytes(), peer).await {
            warn!("UDP send to {} failed: {}", peer, e);
        }
    }
}

fn monotonic_now() -> Duration {
    use std::time::Instant;
    static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
    START.get_or_init(Instant::now).elapsed()
}
