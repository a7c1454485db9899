//! GDB/MI protocol engine
//!
//! Parses the machine-interface output of gdb and lldb-mi into typed
//! [`Record`](gdb::Record) trees, and resolves logical debugger operations
//! into the command syntax a given backend version and platform expects.
//!
//! ```
//! use gdb_mi_bridge::gdb::{MiParser, Peculiarity, Platform, Version};
//!
//! let record = MiParser::new().parse_line(r#"^done,value="42""#);
//! assert_eq!(record.values().const_value("value"), Some("42"));
//!
//! let peculiarity = Peculiarity::new(Version::new(7, 7), Platform::LinuxX86, false);
//! assert_eq!(peculiarity.exec_step("1"), "-exec-step --thread 1");
//! ```

pub mod gdb;
