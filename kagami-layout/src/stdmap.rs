//! 外部プロセス内の順序付きマップ（MSVC std::map）の走査
//!
//! MSVC x64 の std::map はヘッダにハブノードへのポインタと要素数を持ち、
//! ハブの parent が赤黒木のルートを指します。ノードは left/parent/right の
//! 三ポインタ、0x19 の is-nil フラグ、0x20 以降にキーと値を持ちます。
//!
//! 呼び出し側にとって挿入順は意味を持たないため、走査順は中順に固定します。
//! 対象プロセスが並行して木を書き換える可能性があるため、要素数と訪問
//! ノード数に上限を設け、超過は破損扱いで打ち切ります。

use crate::{Addr, ForeignRead, ForeignReadExt, ReadError, RemoteLayout};

/// 走査する要素数の妥当性上限
pub const MAX_MAP_ENTRIES: u64 = 0x1000;

const NODE_LEFT: u64 = 0x00;
const NODE_PARENT: u64 = 0x08;
const NODE_RIGHT: u64 = 0x10;
const NODE_IS_NIL: u64 = 0x19;
const NODE_KEY: u64 = 0x20;

/// マップヘッダ（0x00: ハブノード、0x08: 要素数）
struct MapHeader {
    head: Addr,
    size: u64,
}

fn read_header(reader: &dyn ForeignRead, addr: Addr) -> Result<MapHeader, ReadError> {
    Ok(MapHeader {
        head: reader.read_layout(addr)?,
        size: reader.read_layout(addr.offset(0x08))?,
    })
}

/// ノードが nil（番兵）かどうかを判定する
fn is_nil(reader: &dyn ForeignRead, node: Addr) -> Result<bool, ReadError> {
    if node.is_null() {
        return Ok(true);
    }
    let flag: u8 = reader.read_layout(node.offset(NODE_IS_NIL))?;
    Ok(flag != 0)
}

/// 指定アドレスの std::map を走査して (キー, 値) の列を返す
///
/// キーはノード内 0x20 に、値はその直後に置かれているものとして
/// デコードします。木の形状は問いません。
pub fn read_std_map<K, V>(
    reader: &dyn ForeignRead,
    addr: Addr,
) -> Result<Vec<(K, V)>, ReadError>
where
    K: RemoteLayout,
    V: RemoteLayout,
{
    let header = read_header(reader, addr)?;
    if header.size == 0 {
        return Ok(Vec::new());
    }
    if header.size > MAX_MAP_ENTRIES {
        return Err(ReadError::BadLayout {
            addr: addr.0,
            reason: "map size over sanity bound",
        });
    }

    let root: Addr = reader.read_layout(header.head.offset(NODE_PARENT))?;

    let mut entries = Vec::with_capacity(header.size as usize);
    let mut stack: Vec<Addr> = Vec::new();
    let mut cursor = root;

    loop {
        // 左端まで降りる
        while !is_nil(reader, cursor)? {
            if stack.len() as u64 > header.size {
                return Err(ReadError::BadLayout {
                    addr: addr.0,
                    reason: "map traversal exceeded declared size",
                });
            }
            stack.push(cursor);
            cursor = reader.read_layout(cursor.offset(NODE_LEFT))?;
        }

        let Some(node) = stack.pop() else {
            break;
        };

        if entries.len() as u64 >= header.size {
            return Err(ReadError::BadLayout {
                addr: addr.0,
                reason: "map traversal exceeded declared size",
            });
        }

        // キーと値は 1 回のスナップショット読み取りでまとめて取る
        let payload = reader.read_bytes(node.offset(NODE_KEY), K::SIZE + V::SIZE)?;
        let key = K::decode(&payload[..K::SIZE])?;
        let value = V::decode(&payload[K::SIZE..])?;
        entries.push((key, value));

        cursor = reader.read_layout(node.offset(NODE_RIGHT))?;
    }

    Ok(entries)
}
