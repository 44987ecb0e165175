//! SOCKS5-relayed transport (the `proxy` strategy).
//!
//! Only the parts of RFC 1928 a WHOIS query needs: no-auth greeting and a
//! CONNECT by domain name. The relayed stream then behaves like a direct
//! socket.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use super::{exchange, FetchRequest, Transport};
use crate::error::LookupError;
use crate::proxies::ProxyList;
use crate::types::{ProxyDescriptor, RawHop, SOCKS_VERSION};

const METHOD_NO_AUTH: u8 = 0x00;
const METHOD_NONE_ACCEPTABLE: u8 = 0xFF;
const CMD_CONNECT: u8 = 0x01;
const ATYP_IPV4: u8 = 0x01;
const ATYP_DOMAIN: u8 = 0x03;
const ATYP_IPV6: u8 = 0x04;

/// Relays the WHOIS query through a SOCKS5 proxy.
pub struct SocksTransport {
    proxies: Arc<ProxyList>,
    connect_timeout: Duration,
    idle_timeout: Duration,
}

impl SocksTransport {
    pub fn new(proxies: Arc<ProxyList>, connect_timeout: Duration, idle_timeout: Duration) -> Self {
        Self {
            proxies,
            connect_timeout,
            idle_timeout,
        }
    }

    fn pick_proxy(&self, requested: Option<&ProxyDescriptor>) -> Result<ProxyDescriptor, LookupError> {
        match requested {
            Some(proxy) if proxy.is_usable() => Ok(proxy.clone()),
            _ => self.proxies.random().ok_or_else(|| {
                LookupError::whois("No proxy available; pass one explicitly or refresh the free proxy list")
            }),
        }
    }

    async fn open(
        &self,
        proxy: &ProxyDescriptor,
        host: &str,
        port: u16,
        budget: Duration,
    ) -> Result<TcpStream, LookupError> {
        let handshake = async {
            let mut stream = TcpStream::connect(proxy.address()).await?;
            socks5_connect(&mut stream, host, port).await?;
            Ok::<_, LookupError>(stream)
        };

        match timeout(budget, handshake).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(err)) => Err(proxy_failure(proxy, err)),
            Err(_) => Err(LookupError::whois(format!(
                "Failed to connect to proxy {}: handshake timed out after {:?}",
                proxy.address, budget
            ))),
        }
    }
}

/// Tag a handshake failure with the proxy it came from.
fn proxy_failure(proxy: &ProxyDescriptor, err: LookupError) -> LookupError {
    match err {
        LookupError::Whois { message, .. } => LookupError::whois(format!(
            "Failed to connect to proxy {}: {}",
            proxy.address, message
        )),
        other => other,
    }
}

#[async_trait]
impl Transport for SocksTransport {
    async fn fetch(&self, request: &FetchRequest<'_>) -> Result<Vec<RawHop>, LookupError> {
        let proxy = self.pick_proxy(request.proxy)?;
        let server = request.server;
        debug!(proxy = %proxy.address(), server = %server.address(), "Connecting through SOCKS5 proxy");

        let mut stream = self
            .open(&proxy, &server.host, server.port, request.budget(self.connect_timeout))
            .await?;

        let text = exchange(&mut stream, &server.render_query(request.domain), self.idle_timeout).await?;
        Ok(vec![RawHop::new(server.host.clone(), text)])
    }
}

/// Negotiate a no-auth session and CONNECT to `host:port`.
pub(crate) async fn socks5_connect<S>(stream: &mut S, host: &str, port: u16) -> Result<(), LookupError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let host_len =
        u8::try_from(host.len()).map_err(|_| LookupError::whois("destination host name too long"))?;

    stream.write_all(&[SOCKS_VERSION, 1, METHOD_NO_AUTH]).await?;

    let mut choice = [0u8; 2];
    stream.read_exact(&mut choice).await?;
    if choice[0] != SOCKS_VERSION {
        return Err(LookupError::whois(format!("unexpected SOCKS version {}", choice[0])));
    }
    match choice[1] {
        METHOD_NO_AUTH => {}
        METHOD_NONE_ACCEPTABLE => {
            return Err(LookupError::whois("proxy accepts no offered authentication method"))
        }
        other => {
            return Err(LookupError::whois(format!(
                "proxy selected unsupported method {:#04x}",
                other
            )))
        }
    }

    let mut connect = Vec::with_capacity(7 + host.len());
    connect.extend_from_slice(&[SOCKS_VERSION, CMD_CONNECT, 0x00, ATYP_DOMAIN, host_len]);
    connect.extend_from_slice(host.as_bytes());
    connect.extend_from_slice(&port.to_be_bytes());
    stream.write_all(&connect).await?;

    let mut head = [0u8; 4];
    stream.read_exact(&mut head).await?;
    if head[1] != 0x00 {
        return Err(LookupError::whois(reply_message(head[1])));
    }

    // Bound address and port are of no use to us but must be drained.
    let bound_len = match head[3] {
        ATYP_IPV4 => 4,
        ATYP_IPV6 => 16,
        ATYP_DOMAIN => {
            let mut len = [0u8; 1];
            stream.read_exact(&mut len).await?;
            len[0] as usize
        }
        other => {
            return Err(LookupError::whois(format!(
                "unknown address type {:#04x} in reply",
                other
            )))
        }
    };
    let mut bound = vec![0u8; bound_len + 2];
    stream.read_exact(&mut bound).await?;

    Ok(())
}

fn reply_message(code: u8) -> &'static str {
    match code {
        0x01 => "general SOCKS server failure",
        0x02 => "connection not allowed by ruleset",
        0x03 => "network unreachable",
        0x04 => "host unreachable",
        0x05 => "connection refused",
        0x06 => "TTL expired",
        0x07 => "command not supported",
        0x08 => "address type not supported",
        _ => "unknown SOCKS error",
    }
}
