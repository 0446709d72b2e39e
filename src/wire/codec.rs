//! Varint framing plus the Data-block wire format:
//! `{num_columns:uvarint, num_rows:uvarint, (column_name, column_type_name, column_bytes)*}`.

use bytes::{Buf, BufMut, BytesMut};

use crate::block::{DataBlock, NamedColumn};
use crate::column::{Column, DataType, Field, PodArray, StringColumn};
use crate::error::{EngineError, EngineResult, ErrorCode};

pub fn write_uvarint(buf: &mut BytesMut, mut value: u64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.put_u8(byte);
        if value == 0 {
            break;
        }
    }
}

pub fn read_uvarint(buf: &mut impl Buf) -> EngineResult<u64> {
    let mut result = 0u64;
    let mut shift = 0;
    loop {
        if !buf.has_remaining() {
            return Err(EngineError::new(ErrorCode::AttemptToReadAfterEof, "uvarint truncated"));
        }
        let byte = buf.get_u8();
        result |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift > 63 {
            return Err(EngineError::new(ErrorCode::NetworkError, "uvarint too long"));
        }
    }
    Ok(result)
}

fn write_string(buf: &mut BytesMut, s: &str) {
    write_uvarint(buf, s.len() as u64);
    buf.put_slice(s.as_bytes());
}

fn read_string(buf: &mut impl Buf) -> EngineResult<String> {
    let len = read_uvarint(buf)? as usize;
    if buf.remaining() < len {
        return Err(EngineError::new(ErrorCode::AttemptToReadAfterEof, "string truncated"));
    }
    let mut bytes = vec![0u8; len];
    buf.copy_to_slice(&mut bytes);
    String::from_utf8(bytes).map_err(|e| EngineError::new(ErrorCode::NetworkError, e.to_string()))
}

/// Encodes a `DataBlock` using each column's native binary serialization —
/// fixed-width columns as raw little-endian arrays, strings as
/// length-prefixed bytes per row.
pub fn encode_block(buf: &mut BytesMut, block: &DataBlock) {
    write_uvarint(buf, block.num_columns() as u64);
    write_uvarint(buf, block.rows() as u64);
    for col in block.columns() {
        write_string(buf, &col.name);
        write_string(buf, &col.data_type.name());
        encode_column(buf, &col.column);
    }
}

fn encode_column(buf: &mut BytesMut, column: &Column) {
    match column {
        Column::UInt64(v) => {
            for &x in v.as_slice() {
                buf.put_u64_le(x);
            }
        }
        Column::Int64(v) => {
            for &x in v.as_slice() {
                buf.put_i64_le(x);
            }
        }
        Column::Float64(v) => {
            for &x in v.as_slice() {
                buf.put_f64_le(x);
            }
        }
        Column::String(s) => {
            for i in 0..s.len() {
                let bytes = s.row_bytes(i);
                write_uvarint(buf, bytes.len() as u64);
                buf.put_slice(bytes);
            }
        }
        Column::Nullable(n) => {
            for &m in &n.null_mask {
                buf.put_u8(m);
            }
            encode_column(buf, &n.data);
        }
        Column::Array(a) => {
            for &o in &a.offsets {
                buf.put_u64_le(o);
            }
            encode_column(buf, &a.data);
        }
        Column::Const(c) => {
            // materialize so the wire format never needs a Const variant tag
            encode_column(buf, &c.materialize());
        }
        Column::LowCardinality(l) => {
            write_uvarint(buf, l.dictionary.len() as u64);
            for idx in &l.index {
                buf.put_u32_le(*idx);
            }
        }
    }
}

pub fn decode_block(buf: &mut impl Buf) -> EngineResult<DataBlock> {
    let num_columns = read_uvarint(buf)? as usize;
    let rows = read_uvarint(buf)? as usize;
    let mut columns = Vec::with_capacity(num_columns);
    for _ in 0..num_columns {
        let name = read_string(buf)?;
        let type_name = read_string(buf)?;
        let data_type = parse_type_name(&type_name)?;
        let column = decode_column(buf, &data_type, rows)?;
        columns.push(NamedColumn { name, data_type, column });
    }
    DataBlock::from_columns(columns)
}

fn parse_type_name(name: &str) -> EngineResult<DataType> {
    Ok(match name {
        "UInt64" => DataType::UInt64,
        "Int64" => DataType::Int64,
        "Float64" => DataType::Float64,
        "String" => DataType::String,
        "Date" => DataType::Date,
        other => return Err(EngineError::new(ErrorCode::TypeMismatch, format!("unsupported wire type name '{other}'"))),
    })
}

fn decode_column(buf: &mut impl Buf, data_type: &DataType, rows: usize) -> EngineResult<Column> {
    Ok(match data_type {
        DataType::UInt64 | DataType::Date => {
            let mut v = PodArray::with_capacity(rows);
            for _ in 0..rows {
                v.push(buf.get_u64_le());
            }
            Column::UInt64(v)
        }
        DataType::Int64 => {
            let mut v = PodArray::with_capacity(rows);
            for _ in 0..rows {
                v.push(buf.get_i64_le());
            }
            Column::Int64(v)
        }
        DataType::Float64 => {
            let mut v = PodArray::with_capacity(rows);
            for _ in 0..rows {
                v.push(buf.get_f64_le());
            }
            Column::Float64(v)
        }
        DataType::String => {
            let mut s = StringColumn::new();
            for _ in 0..rows {
                let len = read_uvarint(buf)? as usize;
                let mut bytes = vec![0u8; len];
                buf.copy_to_slice(&mut bytes);
                s.push_str(&String::from_utf8_lossy(&bytes));
            }
            Column::String(s)
        }
        other => return Err(EngineError::new(ErrorCode::UnsupportedMethod, format!("wire decode for {other:?} not supported"))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::NamedColumn;

    #[test]
    fn uvarint_round_trips() {
        for v in [0u64, 1, 127, 128, 300, u64::MAX] {
            let mut buf = BytesMut::new();
            write_uvarint(&mut buf, v);
            let mut reader = buf.freeze();
            assert_eq!(read_uvarint(&mut reader).unwrap(), v);
        }
    }

    #[test]
    fn block_round_trips_through_the_wire_format() {
        let mut c = Column::UInt64(PodArray::new());
        for i in 0..5u64 {
            c.insert_field(Field::UInt64(i * 10)).unwrap();
        }
        let block = DataBlock::from_columns(vec![NamedColumn { name: "n".into(), data_type: DataType::UInt64, column: c }]).unwrap();

        let mut buf = BytesMut::new();
        encode_block(&mut buf, &block);
        let mut reader = buf.freeze();
        let decoded = decode_block(&mut reader).unwrap();
        assert_eq!(decoded, block);
    }
}
