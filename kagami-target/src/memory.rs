//! メモリ読み取り機能

use crate::Result;
use kagami_layout::{Addr, ForeignRead, ReadError};
use nix::unistd::Pid;
use std::fs::File;
use std::io::{BufRead, BufReader, Read as _, Seek, SeekFrom};

/// 観測対象プロセスのメモリへの読み取り専用アクセス
///
/// /proc/pid/mem を使用してターゲットプロセスのメモリを読み取ります。
/// 対象プロセスは停止させないため、読み取りは常にベストエフォートの
/// スナップショットです。
pub struct Memory {
    pid: Pid,
}

impl Memory {
    /// メモリアクセスを作成する
    pub fn new(pid: i32) -> Self {
        Self {
            pid: Pid::from_raw(pid),
        }
    }

    /// プロセスIDを取得する
    pub fn pid(&self) -> i32 {
        self.pid.as_raw()
    }

    /// /proc/pid/mem のパスを取得する
    fn mem_path(&self) -> String {
        format!("/proc/{}/mem", self.pid)
    }

    /// 対象プロセスがまだ存在するかを確認する
    pub fn is_alive(&self) -> bool {
        std::path::Path::new(&format!("/proc/{}", self.pid)).exists()
    }

    /// I/O エラーを読み取りエラーに写像する
    fn map_io_error(addr: u64, err: &std::io::Error) -> ReadError {
        match err.raw_os_error() {
            // EIO: 未マッピング領域
            Some(5) => ReadError::Unmapped(addr),
            // ESRCH: プロセス終了
            Some(3) => ReadError::ProcessExited,
            // EACCES / EPERM: ptrace 権限なし
            Some(13) | Some(1) => ReadError::AccessDenied,
            _ => match err.kind() {
                std::io::ErrorKind::NotFound => ReadError::ProcessExited,
                std::io::ErrorKind::PermissionDenied => ReadError::AccessDenied,
                _ => ReadError::Unmapped(addr),
            },
        }
    }

    /// /proc/pid/maps を解析してメモリマッピング情報を取得する
    pub fn get_mappings(&self) -> Result<Vec<MemoryMapping>> {
        let maps_path = format!("/proc/{}/maps", self.pid);
        let file = File::open(&maps_path)
            .map_err(|e| anyhow::anyhow!("Failed to open {}: {}", maps_path, e))?;
        let reader = BufReader::new(file);

        let mut mappings = Vec::new();

        for line in reader.lines() {
            let line = line?;
            // フォーマット: "address perms offset dev inode pathname"
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 2 {
                continue;
            }

            let addr_parts: Vec<&str> = parts[0].split('-').collect();
            if addr_parts.len() != 2 {
                continue;
            }

            let start = u64::from_str_radix(addr_parts[0], 16)
                .map_err(|e| anyhow::anyhow!("Failed to parse start address: {}", e))?;
            let end = u64::from_str_radix(addr_parts[1], 16)
                .map_err(|e| anyhow::anyhow!("Failed to parse end address: {}", e))?;

            let perms = parts[1];
            let readable = perms.chars().next() == Some('r');
            let writable = perms.chars().nth(1) == Some('w');
            let executable = perms.chars().nth(2) == Some('x');

            mappings.push(MemoryMapping {
                start,
                end,
                readable,
                writable,
                executable,
            });
        }

        Ok(mappings)
    }

    /// 指定されたアドレスが有効なメモリマッピング内にあるかチェックする
    pub fn is_mapped(&self, addr: Addr) -> Result<bool> {
        let mappings = self.get_mappings()?;
        Ok(mappings.iter().any(|m| addr.0 >= m.start && addr.0 < m.end))
    }
}

impl ForeignRead for Memory {
    fn read_bytes(&self, addr: Addr, len: usize) -> std::result::Result<Vec<u8>, ReadError> {
        let mem_path = self.mem_path();
        let mut file =
            File::open(&mem_path).map_err(|e| Self::map_io_error(addr.0, &e))?;

        file.seek(SeekFrom::Start(addr.0))
            .map_err(|e| Self::map_io_error(addr.0, &e))?;

        let mut buffer = vec![0u8; len];
        let mut got = 0usize;
        while got < len {
            match file.read(&mut buffer[got..]) {
                Ok(0) => {
                    return Err(ReadError::ShortRead {
                        addr: addr.0,
                        wanted: len,
                        got,
                    })
                }
                Ok(n) => got += n,
                Err(e) => return Err(Self::map_io_error(addr.0 + got as u64, &e)),
            }
        }

        Ok(buffer)
    }
}

/// メモリマッピング情報
#[derive(Debug, Clone)]
pub struct MemoryMapping {
    pub start: u64,
    pub end: u64,
    pub readable: bool,
    pub writable: bool,
    pub executable: bool,
}
