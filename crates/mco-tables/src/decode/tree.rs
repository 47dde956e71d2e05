//! GHM decision tree (`ARBREDEC`).
//!
//! One section of 6-byte nodes:
//!
//! | Offset | Field          | Type  |
//! |--------|----------------|-------|
//! | 0      | function       | u8    |
//! | 1-2    | params         | u8[2] |
//! | 3      | children_count | u8    |
//! | 4-5    | children_idx   | u16   |

use mco_model::GhmCode;

use crate::bytes::ByteReader;
use crate::error::{Result, ensure_table};
use crate::guard::AppendGuard;
use crate::types::{GhmDecisionNode, TableInfo};

use super::{section, truncated};

const NODE_LEN: usize = 6;
/// Function id of leaf nodes.
const LEAF_FUNCTION: u8 = 12;
/// Function id of unconditional jumps.
const JUMP_FUNCTION: u8 = 20;

const LEAF_TYPE_CHARS: [u8; 10] = [0, b'C', b'H', b'K', b'M', b'Z', b' ', b' ', b' ', b' '];
const LEAF_MODE_CHARS: [u8; 10] = [0, b'A', b'B', b'C', b'D', b'E', b'J', b'Z', b' ', b' '];

struct RawNode {
    function: u8,
    params: [u8; 2],
    children_count: u8,
    children_idx: u16,
}

fn read_node(record: &[u8]) -> Option<RawNode> {
    let mut reader = ByteReader::new(record);
    Some(RawNode {
        function: reader.u8()?,
        params: reader.array()?,
        children_count: reader.u8()?,
        children_idx: reader.u16()?,
    })
}

pub fn parse_ghm_decision_tree(
    data: &[u8],
    table: &TableInfo,
    out: &mut Vec<GhmDecisionNode>,
) -> Result<()> {
    let mut nodes = AppendGuard::new(out);
    let file = table.file.as_str();

    ensure_table!(file, table.sections.len() == 1);
    let nodes_section = section(table, 0)?;
    ensure_table!(file, nodes_section.stride == NODE_LEN);
    let node_count = nodes_section.count;

    for record in nodes_section.records(data) {
        let RawNode {
            function,
            params,
            children_count,
            children_idx,
        } = read_node(record).ok_or_else(|| truncated(table))?;
        let children_idx = usize::from(children_idx);

        let node = if function == LEAF_FUNCTION {
            GhmDecisionNode::Leaf {
                ghm: GhmCode::new(
                    params[1],
                    LEAF_TYPE_CHARS[children_idx / 1000 % 10],
                    (children_idx / 10 % 100) as u8,
                    LEAF_MODE_CHARS[children_idx % 10],
                ),
                error: params[0],
            }
        } else {
            let (children_idx, children_count) = if function == JUMP_FUNCTION {
                let target = children_idx + (usize::from(params[0]) << 8) + usize::from(params[1]);
                (target, 1)
            } else {
                (children_idx, usize::from(children_count))
            };
            ensure_table!(file, children_count > 0);
            ensure_table!(file, children_idx <= node_count);
            ensure_table!(file, children_count <= node_count - children_idx);
            GhmDecisionNode::Test {
                function,
                params,
                children_idx,
                children_count,
            }
        };
        nodes.push(node);
    }

    nodes.commit();
    Ok(())
}
