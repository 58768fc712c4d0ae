//! Modbus TCP device port.
//!
//! Direction flags are coils, actuator positions are holding registers. The
//! connection is opened lazily and dropped after any transport failure; the
//! next request reconnects. Reads retry with backoff, writes are sent once.

use async_trait::async_trait;
use lift_common::frame::config::LiftConfig;
use lift_common::port::{DevicePort, PortError};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_modbus::client::{Context, Reader, Writer, tcp};
use tokio_modbus::{ExceptionCode, Slave};
use tracing::{debug, info, warn};

use super::retry::RetryPolicy;

/// Factory used by the driver registry.
pub fn create_driver(config: &LiftConfig) -> Result<Box<dyn DevicePort>, PortError> {
    Ok(Box::new(ModbusPort::from_config(config)?))
}

/// Modbus TCP client for one field device.
pub struct ModbusPort {
    host: String,
    port: u16,
    unit_id: u8,
    timeout: Duration,
    retry: RetryPolicy,
    ctx: Option<Context>,
}

impl ModbusPort {
    /// Create a port from the `[device]` section. Does not connect.
    pub fn from_config(config: &LiftConfig) -> Result<Self, PortError> {
        let device = &config.device;
        if device.host.trim().is_empty() {
            return Err(PortError::Transport("device.host is empty".into()));
        }
        Ok(Self {
            host: device.host.clone(),
            port: device.port,
            unit_id: device.unit_id,
            timeout: device.timeout(),
            retry: RetryPolicy::from(&device.reconnect),
            ctx: None,
        })
    }

    /// `host:port` for log output.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether a connection is currently open.
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.ctx.is_some()
    }

    async fn ensure_connected(&mut self) -> Result<(), PortError> {
        if self.ctx.is_some() {
            return Ok(());
        }
        let addr = resolve(self.host.clone(), self.port).await?;
        let ctx = timeout(self.timeout, tcp::connect_slave(addr, Slave(self.unit_id)))
            .await
            .map_err(|_| PortError::Timeout(self.timeout))?
            .map_err(|e| PortError::Transport(format!("connect {}: {e}", self.endpoint())))?;
        info!("Connected to Modbus device {} (unit {})", addr, self.unit_id);
        self.ctx = Some(ctx);
        Ok(())
    }

    /// Map a timed reply to the port error model. Drops the connection on
    /// anything but a clean answer or a device exception.
    fn settle<T>(
        &mut self,
        reply: Result<tokio_modbus::Result<T>, tokio::time::error::Elapsed>,
    ) -> Result<T, PortError> {
        match reply {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(exception))) => Err(exception_error(exception)),
            Ok(Err(tokio_modbus::Error::Protocol(err))) => {
                self.ctx = None;
                Err(PortError::Protocol(format!("{err:?}")))
            }
            Ok(Err(err)) => {
                self.ctx = None;
                Err(PortError::Transport(err.to_string()))
            }
            Err(_) => {
                self.ctx = None;
                Err(PortError::Timeout(self.timeout))
            }
        }
    }

    async fn read_coils_once(&mut self, address: u16, count: u16) -> Result<Vec<bool>, PortError> {
        self.ensure_connected().await?;
        let ctx = self.ctx.as_mut().ok_or(PortError::NotConnected)?;
        let reply = timeout(self.timeout, ctx.read_coils(address, count)).await;
        let mut flags = self.settle(reply)?;
        // Coil replies are padded to whole bytes.
        flags.truncate(count as usize);
        Ok(flags)
    }

    async fn read_registers_once(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, PortError> {
        self.ensure_connected().await?;
        let ctx = self.ctx.as_mut().ok_or(PortError::NotConnected)?;
        let reply = timeout(self.timeout, ctx.read_holding_registers(address, count)).await;
        self.settle(reply)
    }

    /// Log a failed read and return how long to wait before the next try.
    fn retry_delay(&self, op: &str, error: &PortError, retry: u32) -> Duration {
        let delay = self.retry.delay_for(retry);
        warn!(
            "{} on {} failed ({}), retry {}/{} in {:?}",
            op,
            self.endpoint(),
            error,
            retry + 1,
            self.retry.max_attempts,
            delay
        );
        delay
    }
}

// Takes owned arguments so the future holds no borrow of the port; the
// Modbus context is not `Sync`.
async fn resolve(host: String, port: u16) -> Result<SocketAddr, PortError> {
    let mut addrs = tokio::net::lookup_host((host.as_str(), port))
        .await
        .map_err(|e| PortError::Transport(format!("resolve {host}:{port}: {e}")))?;
    addrs
        .next()
        .ok_or_else(|| PortError::Transport(format!("no address for {host}:{port}")))
}

fn exception_error(exception: ExceptionCode) -> PortError {
    PortError::Protocol(format!("device exception {exception:?}"))
}

#[async_trait]
impl DevicePort for ModbusPort {
    fn name(&self) -> &'static str {
        "modbus"
    }

    async fn read_flags(&mut self, address: u16, count: u16) -> Result<Vec<bool>, PortError> {
        let mut retries = 0;
        loop {
            match self.read_coils_once(address, count).await {
                Err(err) if self.retry.should_retry(&err, retries) => {
                    let delay = self.retry_delay("read_coils", &err, retries);
                    sleep(delay).await;
                    retries += 1;
                }
                other => return other,
            }
        }
    }

    async fn read_words(&mut self, address: u16, count: u16) -> Result<Vec<u16>, PortError> {
        let mut retries = 0;
        loop {
            match self.read_registers_once(address, count).await {
                Err(err) if self.retry.should_retry(&err, retries) => {
                    let delay = self.retry_delay("read_holding_registers", &err, retries);
                    sleep(delay).await;
                    retries += 1;
                }
                other => return other,
            }
        }
    }

    async fn write_flag(&mut self, address: u16, value: bool) -> Result<(), PortError> {
        self.ensure_connected().await?;
        let ctx = self.ctx.as_mut().ok_or(PortError::NotConnected)?;
        let reply = timeout(self.timeout, ctx.write_single_coil(address, value)).await;
        self.settle(reply)?;
        debug!("coil {} <- {}", address, value);
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), PortError> {
        if self.ctx.take().is_some() {
            info!("Disconnected from Modbus device {}", self.endpoint());
        }
        Ok(())
    }
}
