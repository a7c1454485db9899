//! Token-correlated MI command channel
//!
//! Writes numbered commands to the backend's stdin and reads its output line
//! by line. The streams come from whoever owns the debugger process.

use crate::gdb::error::{MiError, Result};
use crate::gdb::parser::MiParser;
use crate::gdb::types::{Record, RecordKind};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tracing::{debug, trace};

/// Reply to one command plus the out-of-band records printed before it
#[derive(Debug, Clone)]
pub struct Reply {
    pub result: Record,
    pub out_of_band: Vec<Record>,
}

impl Reply {
    /// Concatenated console stream output, e.g. for console commands
    pub fn console_output(&self) -> String {
        self.out_of_band
            .iter()
            .filter(|r| r.kind() == RecordKind::ConsoleStream)
            .filter_map(Record::text)
            .collect()
    }
}

/// MI channel over a reader/writer pair
pub struct MiChannel<R, W> {
    lines: Lines<R>,
    writer: W,
    parser: MiParser,
    /// Token counter for MI commands
    next_token: u64,
}

impl<R, W> MiChannel<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, parser: MiParser) -> Self {
        Self {
            lines: reader.lines(),
            writer,
            parser,
            next_token: 1,
        }
    }

    pub fn parser(&self) -> &MiParser {
        &self.parser
    }

    /// Send a command, returning its token
    pub async fn send(&mut self, command: &str) -> Result<u64> {
        let token = self.next_token;
        self.next_token += 1;

        let full_command = format!("{}{}\n", token, command);
        debug!("Sending command: {}", full_command.trim_end());
        self.writer.write_all(full_command.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(token)
    }

    /// Next record, or `None` once the backend closed its output
    pub async fn next_record(&mut self) -> Result<Option<Record>> {
        match self.lines.next_line().await? {
            Some(line) => {
                trace!("GDB output: {}", line);
                Ok(Some(self.parser.parse_line(&line)))
            }
            None => Ok(None),
        }
    }

    /// Send a command and wait for the result record carrying its token
    pub async fn execute(&mut self, command: &str) -> Result<Reply> {
        let token = self.send(command).await?;
        let mut out_of_band = Vec::new();
        loop {
            let record = self.next_record().await?.ok_or(MiError::ChannelClosed)?;
            if record.is_result() && record.token() == Some(token) {
                return Ok(Reply {
                    result: record,
                    out_of_band,
                });
            }
            out_of_band.push(record);
        }
    }
}
