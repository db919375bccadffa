use std::fmt::Write;
use std::net::{Ipv4Addr, Ipv6Addr};

use ipnetwork::{IpNetwork, Ipv4Network, Ipv6Network};
use mac_address::MacAddress;
use pgcodec_core::error::{BoxDynError, Error};
use pgcodec_core::io::BufExt;

use crate::arguments::PgArgumentBuffer;
use crate::plan::expect_len;
use crate::types::WireValue;

// https://github.com/postgres/postgres/blob/574925bfd0a8175f6e161936ea11d9695677ba09/src/include/utils/inet.h#L39

// Technically this is a magic number here but it doesn't make sense to drag in the whole of `libc`
// just for one constant.
const PGSQL_AF_INET: u8 = 2; // AF_INET
const PGSQL_AF_INET6: u8 = PGSQL_AF_INET + 1;

crate::impl_host_scalar!(IpNetwork, MacAddress);

impl WireValue for IpNetwork {
    // https://github.com/postgres/postgres/blob/574925bfd0a8175f6e161936ea11d9695677ba09/src/backend/utils/adt/network.c#L293
    fn encode_binary(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        // the server ignores `is_cidr` on input and checks the masked bits itself
        match self {
            IpNetwork::V4(net) => {
                buf.push(PGSQL_AF_INET); // ip_family
                buf.push(net.prefix()); // ip_bits
                buf.push(0); // is_cidr
                buf.push(4); // nb (number of bytes)
                buf.extend_from_slice(&net.ip().octets()); // address
            }

            IpNetwork::V6(net) => {
                buf.push(PGSQL_AF_INET6);
                buf.push(net.prefix());
                buf.push(0);
                buf.push(16);
                buf.extend_from_slice(&net.ip().octets());
            }
        }

        Ok(())
    }

    fn encode_text(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        // a single host is written without its prefix, as `inet` output does
        let s = if self.prefix() == max_prefix(self) {
            self.ip().to_string()
        } else {
            self.to_string()
        };

        buf.put_str(&s);
        Ok(())
    }

    fn decode_binary(mut src: &[u8]) -> Result<Self, BoxDynError> {
        let family = src.try_get_u8()?;
        let prefix = src.try_get_u8()?;
        let _is_cidr = src.try_get_u8()? != 0;
        let len = src.try_get_u8()?;

        match (family, len) {
            (PGSQL_AF_INET, 4) => {
                let octets: [u8; 4] = src.try_get_bytes(4)?.try_into()?;
                expect_len(src, 0, "inet")?;

                Ok(IpNetwork::V4(Ipv4Network::new(Ipv4Addr::from(octets), prefix)?))
            }

            (PGSQL_AF_INET6, 16) => {
                let octets: [u8; 16] = src.try_get_bytes(16)?.try_into()?;
                expect_len(src, 0, "inet")?;

                Ok(IpNetwork::V6(Ipv6Network::new(Ipv6Addr::from(octets), prefix)?))
            }

            (PGSQL_AF_INET | PGSQL_AF_INET6, _) => {
                Err(Error::protocol(format!("invalid address length {len} for inet")).into())
            }

            _ => Err(Error::protocol(format!("unknown ip family {family}")).into()),
        }
    }

    fn decode_text(src: &str) -> Result<Self, BoxDynError> {
        Ok(src.parse()?)
    }
}

fn max_prefix(net: &IpNetwork) -> u8 {
    match net {
        IpNetwork::V4(_) => 32,
        IpNetwork::V6(_) => 128,
    }
}

impl WireValue for MacAddress {
    fn encode_binary(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        buf.extend_from_slice(&self.bytes());
        Ok(())
    }

    fn encode_text(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        let mut s = String::with_capacity(17);

        for (i, byte) in self.bytes().iter().enumerate() {
            if i > 0 {
                s.push(':');
            }
            let _ = write!(s, "{byte:02x}");
        }

        buf.put_str(&s);
        Ok(())
    }

    fn decode_binary(src: &[u8]) -> Result<Self, BoxDynError> {
        expect_len(src, 6, "macaddr")?;

        let bytes: [u8; 6] = src.try_into()?;
        Ok(MacAddress::new(bytes))
    }

    fn decode_text(src: &str) -> Result<Self, BoxDynError> {
        Ok(src.parse()?)
    }
}

scalar_codec!(
    /// `inet` and `cidr`.
    InetCodec, IpNetwork, Inet
);

scalar_codec!(
    /// `macaddr`.
    MacaddrCodec, MacAddress, MacAddr
);
