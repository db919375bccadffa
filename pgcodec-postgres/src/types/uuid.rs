use pgcodec_core::error::BoxDynError;
use uuid::Uuid;

use crate::arguments::PgArgumentBuffer;
use crate::types::WireValue;

crate::impl_host_scalar!(Uuid);

impl WireValue for Uuid {
    fn encode_binary(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        buf.extend_from_slice(self.as_bytes());
        Ok(())
    }

    fn encode_text(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        buf.put_str(self.hyphenated().encode_lower(&mut Uuid::encode_buffer()));
        Ok(())
    }

    fn decode_binary(src: &[u8]) -> Result<Self, BoxDynError> {
        Ok(Uuid::from_slice(src)?)
    }

    fn decode_text(src: &str) -> Result<Self, BoxDynError> {
        Ok(Uuid::parse_str(src)?)
    }
}

scalar_codec!(
    /// `uuid`.
    UuidCodec, Uuid, Uuid
);
