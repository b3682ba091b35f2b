//! Writing operator-supplied values to the controller.

use std::sync::Arc;

use tracing::debug;

use crate::bridge::DeviceBridge;
use crate::codec;
use crate::error::{Error, Result};
use crate::types::{DataType, MonitorValue};

/// Confirmation echoed to the caller after a successful write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WriteConfirmation {
    pub address: u16,
    pub value: MonitorValue,
}

/// Encodes operator input and issues the matching bridge write call.
///
/// The only local validation is literal parsing; range checks and address
/// validation are the bridge's business, and its error messages pass
/// through verbatim.
pub struct ValueWriter {
    bridge: Arc<dyn DeviceBridge>,
}

impl ValueWriter {
    pub fn new(bridge: Arc<dyn DeviceBridge>) -> Self {
        Self { bridge }
    }

    /// Parse `literal` for `data_type` and write it to `address`.
    ///
    /// Bool uses the historical literal rule: the lowercased literal must
    /// equal `"true"`, anything else writes false. Word wraps to 16 bits.
    /// DWord/Float go through the register codec as a low-word-first
    /// two-register write.
    pub async fn write_value(
        &self,
        connection_id: i64,
        address: u16,
        data_type: DataType,
        literal: &str,
    ) -> Result<WriteConfirmation> {
        let value = match data_type {
            DataType::Bool => {
                let value = literal.trim().to_lowercase() == "true";
                self.bridge
                    .write_single_coil(connection_id, address, value)
                    .await?;
                MonitorValue::Bool(value)
            }
            DataType::Word => {
                let value = parse_int(literal, "word")? as u16;
                self.bridge
                    .write_single_register(connection_id, address, value)
                    .await?;
                MonitorValue::Word(value)
            }
            DataType::DWord => {
                let value = parse_int(literal, "dword")? as u32;
                let words = codec::encode_u32(value);
                self.bridge
                    .write_multiple_registers(connection_id, address, &words)
                    .await?;
                MonitorValue::DWord(value)
            }
            DataType::Float => {
                let value: f32 = literal.trim().parse().map_err(|_| Error::Parse {
                    literal: literal.to_string(),
                    expected: "float".to_string(),
                })?;
                let words = codec::encode_f32(value);
                self.bridge
                    .write_multiple_registers(connection_id, address, &words)
                    .await?;
                MonitorValue::Float(value)
            }
        };

        debug!(connection_id, address, %value, "Wrote value");
        Ok(WriteConfirmation { address, value })
    }
}

fn parse_int(literal: &str, expected: &str) -> Result<i64> {
    literal.trim().parse::<i64>().map_err(|_| Error::Parse {
        literal: literal.to_string(),
        expected: expected.to_string(),
    })
}
