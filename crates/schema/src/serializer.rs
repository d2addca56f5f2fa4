//! 记录序列化
//!
//! 线上格式：[magic_byte(1)][schema_id(4, big-endian)][avro datum(N)]

use apache_avro::{from_avro_datum, from_value, to_avro_datum, to_value};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use courier_errors::{AppError, AppResult};

use crate::{AvroRecord, SchemaHandle};

/// Magic byte
pub const MAGIC_BYTE: u8 = 0x00;

const HEADER_LEN: usize = 5;

/// 记录序列化器
///
/// 无内部状态，结果只取决于 (record, schema)
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordSerializer;

impl RecordSerializer {
    pub fn new() -> Self {
        Self
    }

    /// 按 schema 编码记录，记录结构与 schema 不符时返回 Serialization 错误
    pub fn serialize<R: AvroRecord>(&self, record: &R, handle: &SchemaHandle) -> AppResult<Bytes> {
        let value = to_value(record)
            .and_then(|value| value.resolve(handle.schema()))
            .map_err(|e| AppError::serialization(format!("Record does not match schema: {}", e)))?;

        let datum = to_avro_datum(handle.schema(), value)
            .map_err(|e| AppError::serialization(format!("Failed to encode record: {}", e)))?;

        Ok(encode_frame(handle.id(), &datum))
    }

    /// `serialize` 的逆操作（消费端解码）
    pub fn deserialize<R: AvroRecord>(&self, payload: &[u8], handle: &SchemaHandle) -> AppResult<R> {
        let (schema_id, mut datum) = decode_frame(payload)?;
        if schema_id != handle.id() {
            return Err(AppError::serialization(format!(
                "Schema id mismatch: payload has {}, expected {}",
                schema_id,
                handle.id()
            )));
        }

        let value = from_avro_datum(handle.schema(), &mut datum, None)
            .map_err(|e| AppError::serialization(format!("Failed to decode datum: {}", e)))?;

        from_value::<R>(&value)
            .map_err(|e| AppError::serialization(format!("Failed to map datum to record: {}", e)))
    }
}

/// 加上 magic byte 与 schema id 头
pub fn encode_frame(schema_id: i32, datum: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + datum.len());
    buf.put_u8(MAGIC_BYTE);
    buf.put_i32(schema_id);
    buf.put_slice(datum);
    buf.freeze()
}

/// 拆出 schema id 与 datum
pub fn decode_frame(payload: &[u8]) -> AppResult<(i32, &[u8])> {
    if payload.len() < HEADER_LEN {
        return Err(AppError::serialization(
            "Payload too short to contain schema id",
        ));
    }

    if payload[0] != MAGIC_BYTE {
        return Err(AppError::serialization(format!(
            "Invalid magic byte: expected 0x00, got 0x{:02x}",
            payload[0]
        )));
    }

    let mut id_bytes = &payload[1..HEADER_LEN];
    Ok((id_bytes.get_i32(), &payload[HEADER_LEN..]))
}
