//! Interpretation of parsed MI records
//!
//! Extracts breakpoints, frames, variables and events from [`Record`]s the
//! way a debugger session controller consumes them.

use crate::gdb::types::*;
use tracing::debug;

/// Human readable failure text of a record
pub fn error_message(record: &Record) -> Option<&str> {
    if record.is_error() {
        record.error()
    } else if !record.is_empty() {
        record.values().const_value("msg")
    } else {
        None
    }
}

fn parse_number<T: std::str::FromStr>(list: &MiList, key: &str) -> Option<T> {
    list.const_value(key).and_then(|s| s.parse().ok())
}

fn owned(list: &MiList, key: &str) -> Option<String> {
    list.const_value(key).map(str::to_string)
}

/// Breakpoint fields of a `bkpt={...}` tuple
pub fn breakpoint_from_tuple(tuple: &MiList) -> Option<Breakpoint> {
    Some(Breakpoint {
        number: owned(tuple, "number")?,
        breakpoint_type: owned(tuple, "type").unwrap_or_default(),
        disposition: owned(tuple, "disp").unwrap_or_default(),
        enabled: tuple.const_value("enabled").map_or(true, |s| s == "y"),
        addr: owned(tuple, "addr"),
        func: owned(tuple, "func"),
        file: owned(tuple, "file"),
        fullname: owned(tuple, "fullname"),
        line: parse_number(tuple, "line"),
        thread_groups: tuple.list_of("thread-groups").map(|groups| {
            groups
                .iter()
                .filter_map(|g| g.value().as_str())
                .map(str::to_string)
                .collect()
        }),
        times: parse_number(tuple, "times").unwrap_or(0),
        original_location: owned(tuple, "original-location"),
        condition: owned(tuple, "cond"),
        ignore_count: parse_number(tuple, "ignore"),
        locations: tuple
            .list_of("locations")
            .map(|locs| locs.iter().filter_map(|l| location_from_tuple(l.value().as_tuple()?)).collect())
            .unwrap_or_default(),
    })
}

fn location_from_tuple(tuple: &MiList) -> Option<BreakpointLocation> {
    Some(BreakpointLocation {
        number: owned(tuple, "number")?,
        enabled: tuple.const_value("enabled").map_or(true, |s| s == "y"),
        addr: owned(tuple, "addr"),
        func: owned(tuple, "func"),
        file: owned(tuple, "file"),
        fullname: owned(tuple, "fullname"),
        line: parse_number(tuple, "line"),
    })
}

/// Breakpoints reported by one record.
///
/// Older gdb prints the locations of a multi-location breakpoint as
/// positional tuples following `bkpt={...}`; newer releases nest them under
/// `locations=[...]`. Both shapes end up in [`Breakpoint::locations`].
pub fn parse_breakpoints(values: &MiList) -> Vec<Breakpoint> {
    let mut breakpoints: Vec<Breakpoint> = Vec::new();
    for item in values {
        let Some(tuple) = item.value().as_tuple() else {
            continue;
        };
        match item.key() {
            Some("bkpt") => {
                if let Some(bp) = breakpoint_from_tuple(tuple) {
                    breakpoints.push(bp);
                }
            }
            None => match (breakpoints.last_mut(), location_from_tuple(tuple)) {
                (Some(parent), Some(location)) => parent.locations.push(location),
                _ => debug!("Stray breakpoint location: {}", tuple),
            },
            Some(_) => {}
        }
    }
    breakpoints
}

/// First breakpoint of a record
pub fn parse_breakpoint(values: &MiList) -> Option<Breakpoint> {
    parse_breakpoints(values).into_iter().next()
}

/// Breakpoints of a `-break-list` reply
pub fn parse_breakpoint_list(values: &MiList) -> Vec<Breakpoint> {
    values
        .tuple_of("BreakpointTable")
        .and_then(|table| table.list_of("body"))
        .map(parse_breakpoints)
        .unwrap_or_default()
}

pub fn frame_from_tuple(tuple: &MiList) -> Option<Frame> {
    Some(Frame {
        level: parse_number(tuple, "level").unwrap_or(0),
        addr: owned(tuple, "addr")?,
        func: owned(tuple, "func"),
        file: owned(tuple, "file"),
        fullname: owned(tuple, "fullname"),
        line: parse_number(tuple, "line"),
        arch: owned(tuple, "arch"),
    })
}

/// `frame={...}` of a stop or `-stack-info-frame` reply
pub fn parse_frame(values: &MiList) -> Option<Frame> {
    frame_from_tuple(values.tuple_of("frame")?)
}

/// Frames of a `-stack-list-frames` reply
pub fn parse_stack_frames(values: &MiList) -> Vec<Frame> {
    values
        .list_of("stack")
        .map(|stack| {
            stack
                .values_of("frame")
                .filter_map(|f| frame_from_tuple(f.as_tuple()?))
                .collect()
        })
        .unwrap_or_default()
}

fn variable_from_tuple(tuple: &MiList) -> Option<Variable> {
    Some(Variable {
        name: owned(tuple, "name")?,
        exp: owned(tuple, "exp"),
        value: owned(tuple, "value"),
        var_type: owned(tuple, "type"),
        numchild: parse_number(tuple, "numchild"),
        has_more: tuple.const_value("has_more") == Some("1"),
    })
}

/// Variable object created by `-var-create`
pub fn parse_variable(values: &MiList) -> Option<Variable> {
    variable_from_tuple(values)
}

/// Children of a `-var-list-children` reply.
///
/// lldb-mi answers `children="[]"` instead of an empty list.
pub fn parse_variable_children(values: &MiList) -> Vec<Variable> {
    let Some(children) = values.list_of("children") else {
        return Vec::new();
    };
    children
        .values_of("child")
        .filter_map(|c| variable_from_tuple(c.as_tuple()?))
        .collect()
}

/// Thread ids of a `-thread-list-ids` reply
pub fn parse_thread_ids(values: &MiList) -> Vec<String> {
    let Some(ids) = values.tuple_of("thread-ids") else {
        return Vec::new();
    };
    ids.values_of("thread-id")
        .filter_map(MiValue::as_str)
        .map(str::to_string)
        .collect()
}

impl GdbEvent {
    /// Event reported by an async or stream record
    pub fn from_record(record: &Record) -> Option<GdbEvent> {
        let values = record.values();
        let thread_id = || owned(values, "thread-id");
        match record.kind() {
            RecordKind::ExecAsync => match record.class()? {
                "stopped" => Some(GdbEvent::Stopped {
                    reason: values
                        .const_value("reason")
                        .map(StopReason::from)
                        .unwrap_or(StopReason::Unknown(String::new())),
                    frame: parse_frame(values),
                    thread_id: thread_id(),
                }),
                "running" => Some(GdbEvent::Running {
                    thread_id: thread_id(),
                }),
                _ => None,
            },
            RecordKind::NotifyAsync => match record.class()? {
                "breakpoint-created" => Some(GdbEvent::BreakpointCreated {
                    breakpoint: parse_breakpoint(values)?,
                }),
                "breakpoint-modified" => Some(GdbEvent::BreakpointModified {
                    breakpoint: parse_breakpoint(values)?,
                }),
                "breakpoint-deleted" => Some(GdbEvent::BreakpointDeleted {
                    number: owned(values, "id")?,
                }),
                "thread-created" => Some(GdbEvent::ThreadCreated {
                    id: owned(values, "id")?,
                    group_id: owned(values, "group-id").unwrap_or_default(),
                }),
                "thread-exited" => Some(GdbEvent::ThreadExited {
                    id: owned(values, "id")?,
                    group_id: owned(values, "group-id").unwrap_or_default(),
                }),
                "thread-selected" => Some(GdbEvent::ThreadSelected {
                    id: owned(values, "id")?,
                }),
                _ => None,
            },
            RecordKind::Result if record.is_error() => Some(GdbEvent::Error {
                message: error_message(record).unwrap_or_default().to_string(),
            }),
            RecordKind::ConsoleStream => output(OutputChannel::Console, record),
            RecordKind::TargetStream => output(OutputChannel::Target, record),
            RecordKind::LogStream => output(OutputChannel::Log, record),
            RecordKind::Result
            | RecordKind::StatusAsync
            | RecordKind::Prompt
            | RecordKind::Malformed => None,
        }
    }
}

fn output(channel: OutputChannel, record: &Record) -> Option<GdbEvent> {
    Some(GdbEvent::Output {
        channel,
        content: record.text()?.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gdb::parser::MiParser;
    use pretty_assertions::assert_eq;

    fn parse(line: &str) -> Record {
        MiParser::new().parse_line(line)
    }

    #[test]
    fn test_parse_breakpoint_list() {
        let record = parse(
            r#"^done,BreakpointTable={nr_rows="1",nr_cols="6",hdr=[],body=[bkpt={number="1",type="breakpoint",disp="keep",enabled="y",addr="0x0000000080000080",thread-groups=["i1"],times="0"}]}"#,
        );
        let bps = parse_breakpoint_list(record.values());
        assert_eq!(bps.len(), 1);
        assert_eq!(bps[0].number, "1");
        assert_eq!(bps[0].addr.as_deref(), Some("0x0000000080000080"));
        assert_eq!(bps[0].thread_groups, Some(vec!["i1".to_string()]));
    }

    #[test]
    fn test_multi_location_breakpoint_positional() {
        let record = parse(concat!(
            r#"^done,bkpt={number="1",type="breakpoint",disp="keep",enabled="y",addr="<MULTIPLE>",times="0"},"#,
            r#"{number="1.1",enabled="y",addr="0x1",func="f<int>",line="8"},"#,
            r#"{number="1.2",enabled="n",addr="0x2",func="f<long>",line="8"}"#
        ));
        let bp = parse_breakpoint(record.values()).unwrap();
        assert_eq!(bp.addr.as_deref(), Some("<MULTIPLE>"));
        assert_eq!(bp.locations.len(), 2);
        assert_eq!(bp.locations[1].number, "1.2");
        assert!(!bp.locations[1].enabled);
        assert_eq!(bp.locations[0].line, Some(8));
    }

    #[test]
    fn test_multi_location_breakpoint_nested() {
        let record = parse(
            r#"=breakpoint-created,bkpt={number="2",type="breakpoint",addr="<MULTIPLE>",locations=[{number="2.1",enabled="y",addr="0x10"},{number="2.2",enabled="y",addr="0x20"}]}"#,
        );
        match GdbEvent::from_record(&record) {
            Some(GdbEvent::BreakpointCreated { breakpoint }) => {
                assert_eq!(breakpoint.number, "2");
                assert_eq!(breakpoint.locations.len(), 2);
            }
            other => panic!("Expected breakpoint event, got {:?}", other),
        }
    }

    #[test]
    fn test_stack_frames() {
        let record = parse(
            r#"^done,stack=[frame={level="0",addr="0x400530",func="foo",file="a.c",line="3"},frame={level="1",addr="0x400540",func="main"}]"#,
        );
        let frames = parse_stack_frames(record.values());
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].level, 1);
        assert_eq!(frames[1].func.as_deref(), Some("main"));
        assert_eq!(frames[0].line, Some(3));
    }

    #[test]
    fn test_variable_and_children() {
        let created = parse(r#"^done,name="var1",numchild="2",value="{...}",type="struct point",thread-id="1",has_more="0""#);
        let var = parse_variable(created.values()).unwrap();
        assert_eq!(var.name, "var1");
        assert_eq!(var.numchild, Some(2));
        assert_eq!(var.var_type.as_deref(), Some("struct point"));

        let children = parse(
            r#"^done,numchild="2",children=[child={name="var1.x",exp="x",numchild="0",value="1",type="int"},child={name="var1.y",exp="y",numchild="0",value="2",type="int"}],has_more="0""#,
        );
        let kids = parse_variable_children(children.values());
        assert_eq!(kids.len(), 2);
        assert_eq!(kids[1].exp.as_deref(), Some("y"));

        let lldb = parse(r#"^done,numchild="0",children="[]",has_more="0""#);
        assert!(parse_variable_children(lldb.values()).is_empty());
    }

    #[test]
    fn test_thread_ids() {
        let record = parse(r#"^done,thread-ids={thread-id="2",thread-id="1"},current-thread-id="1",number-of-threads="2""#);
        assert_eq!(parse_thread_ids(record.values()), ["2", "1"]);
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(&parse(r#"^error,msg="No symbol \"x\" in current context.""#)),
            Some("No symbol \"x\" in current context.")
        );
        assert_eq!(error_message(&parse("^error")), None);
        assert_eq!(error_message(&parse(r#"^done,msg="odd""#)), Some("odd"));
    }

    #[test]
    fn test_stopped_event() {
        let record = parse(
            r#"*stopped,reason="end-stepping-range",frame={addr="0x1",func="main",args=[]},thread-id="1",stopped-threads="all""#,
        );
        match GdbEvent::from_record(&record) {
            Some(GdbEvent::Stopped {
                reason,
                frame,
                thread_id,
            }) => {
                assert_eq!(reason, StopReason::EndSteppingRange);
                assert_eq!(frame.and_then(|f| f.func), Some("main".to_string()));
                assert_eq!(thread_id.as_deref(), Some("1"));
            }
            other => panic!("Expected stopped event, got {:?}", other),
        }
    }

    #[test]
    fn test_other_events() {
        assert_eq!(
            GdbEvent::from_record(&parse(r#"=thread-created,id="2",group-id="i1""#)),
            Some(GdbEvent::ThreadCreated {
                id: "2".to_string(),
                group_id: "i1".to_string()
            })
        );
        assert_eq!(
            GdbEvent::from_record(&parse(r#"=breakpoint-deleted,id="3""#)),
            Some(GdbEvent::BreakpointDeleted {
                number: "3".to_string()
            })
        );
        assert_eq!(
            GdbEvent::from_record(&parse(r#"*running,thread-id="all""#)),
            Some(GdbEvent::Running {
                thread_id: Some("all".to_string())
            })
        );
        assert_eq!(
            GdbEvent::from_record(&parse(r#"&"warning\n""#)),
            Some(GdbEvent::Output {
                channel: OutputChannel::Log,
                content: "warning\n".to_string()
            })
        );
        assert_eq!(GdbEvent::from_record(&parse("(gdb)")), None);
        assert_eq!(GdbEvent::from_record(&parse("^done")), None);
    }
}
