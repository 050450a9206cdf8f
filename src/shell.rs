use std::io::Write;

use time::macros::format_description;
use time::OffsetDateTime;

use crate::filesystem::{blocks_for_size, Filesystem};
use crate::Error;

const AVAILABLE: &str = "exit, touch, rm, mkdir, rmdir, cd, ls, cp, sum, cat, debug";

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Exit,
}

/// Print the prompt and tokenise one input line. `None` means the
/// input stream is gone and the shell should flush and leave.
pub fn prompt(path: &str) -> Option<Vec<String>> {
    let mut line = String::new();
    print!("fs:{path}> ");
    std::io::stdout().flush().ok()?;
    match std::io::stdin().read_line(&mut line) {
        Ok(0) => None,
        Ok(_) => Some(line.split_whitespace().map(str::to_string).collect()),
        Err(_) => None,
    }
}

fn format_time(seconds: u32) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    OffsetDateTime::from_unix_timestamp(seconds as i64)
        .ok()
        .and_then(|stamp| stamp.format(&format).ok())
        .unwrap_or_else(|| seconds.to_string())
}

fn percent(part: u32, whole: u32) -> f64 {
    part as f64 * 100.0 / whole as f64
}

fn arg(args: &[String], index: usize) -> &str {
    args.get(index).map(String::as_str).unwrap_or("")
}

pub fn execute(fs: &mut Filesystem, args: &[String]) -> Result<Outcome, Error> {
    let Some(command) = args.first() else {
        return Ok(Outcome::Continue);
    };
    match command.as_str() {
        "exit" => return Ok(Outcome::Exit),
        "touch" => {
            let path = arg(args, 1);
            let size: u32 = args.get(2).and_then(|raw| raw.parse().ok()).unwrap_or(0);
            fs.create_file(path, size)?;
            println!(
                "Created file: {path} (size: {size} bytes, blocks: {})",
                blocks_for_size(size)
            );
        }
        "rm" => {
            let path = arg(args, 1);
            fs.remove_file(path)?;
            println!("Removed file: {path}");
        }
        "mkdir" => {
            let path = arg(args, 1);
            fs.create_dir(path)?;
            println!("Created directory: {path}");
        }
        "rmdir" => {
            let path = arg(args, 1);
            fs.remove_dir(path)?;
            println!("Removed directory: {path}");
        }
        "cd" => fs.change_dir(arg(args, 1))?,
        "ls" => {
            let path = arg(args, 1);
            let rows = fs.list(path)?;
            let shown = if path.is_empty() {
                fs.current_path()
            } else {
                path
            };
            println!("Contents of {shown}:");
            println!("{:<30}{:<10}{:>10}  {}", "Name", "Type", "Size", "Modified");
            println!("{}", "-".repeat(60));
            for row in rows {
                let kind = if row.directory { "Directory" } else { "File" };
                println!(
                    "{:<30}{:<10}{:>10}  {}",
                    row.name,
                    kind,
                    row.size,
                    format_time(row.mtime)
                );
            }
        }
        "cp" => {
            let src = arg(args, 1);
            let dst = arg(args, 2);
            fs.copy_file(src, dst)?;
            println!("Copied file: {src} -> {dst}");
        }
        "cat" => {
            let path = arg(args, 1);
            let content = fs.read_file(path)?;
            println!("Contents of {path} ({} bytes):", content.len());
            std::io::stdout().write_all(&content)?;
            println!();
        }
        "sum" => {
            let usage = fs.summary();
            let block_size = usage.block_size as u64;
            println!("File System Summary:");
            println!("-------------------");
            println!(
                "Total space: {} bytes ({} blocks)",
                usage.total_blocks as u64 * block_size,
                usage.total_blocks
            );
            println!(
                "Used space: {} bytes ({} blocks, {:.1}%)",
                usage.used_blocks as u64 * block_size,
                usage.used_blocks,
                percent(usage.used_blocks, usage.total_blocks)
            );
            println!(
                "Free space: {} bytes ({} blocks, {:.1}%)",
                usage.free_blocks as u64 * block_size,
                usage.free_blocks,
                percent(usage.free_blocks, usage.total_blocks)
            );
            println!(
                "Inodes: {} used, {} free, {} total",
                usage.used_inodes, usage.free_inodes, usage.total_inodes
            );
        }
        "debug" => {
            let report = fs.check()?;
            println!("=== File System Debug Information ===");
            println!("{}", report.superblock);
            println!();
            println!("Checking free list integrity...");
            println!(
                "Counted {} blocks in free list (should be {})",
                report.free_block_list_len, report.superblock.free_blocks
            );
            if report.free_block_list_len != report.superblock.free_blocks {
                println!("WARNING: Free block count mismatch!");
            }
            println!(
                "Counted {} inodes in free list (should be {})",
                report.free_inode_list_len, report.superblock.free_inodes
            );
            if report.free_inode_list_len != report.superblock.free_inodes {
                println!("WARNING: Free inode count mismatch!");
            }
        }
        unknown => {
            println!("Unknown command: {unknown}");
            println!("Available commands: {AVAILABLE}");
        }
    }
    Ok(Outcome::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(raw: &str) -> Vec<String> {
        raw.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn exit_terminates() {
        let mut fs = Filesystem::new().unwrap();
        assert_eq!(execute(&mut fs, &line("exit")).unwrap(), Outcome::Exit);
    }

    #[test]
    fn empty_and_unknown_input_continue() {
        let mut fs = Filesystem::new().unwrap();
        assert_eq!(execute(&mut fs, &[]).unwrap(), Outcome::Continue);
        assert_eq!(execute(&mut fs, &line("frobnicate")).unwrap(), Outcome::Continue);
    }

    #[test]
    fn touch_defaults_to_empty_file() {
        let mut fs = Filesystem::new().unwrap();
        execute(&mut fs, &line("touch f")).unwrap();
        assert_eq!(fs.read_file("/f").unwrap().len(), 0);
        execute(&mut fs, &line("touch g 2048")).unwrap();
        assert_eq!(fs.read_file("/g").unwrap().len(), 2048);
    }

    #[test]
    fn commands_surface_core_errors() {
        let mut fs = Filesystem::new().unwrap();
        assert!(matches!(
            execute(&mut fs, &line("rm missing")),
            Err(Error::PathNotFound)
        ));
        assert!(matches!(
            execute(&mut fs, &line("touch")),
            Err(Error::PathNotFound)
        ));
    }

    #[test]
    fn mkdir_then_cd_updates_prompt_path() {
        let mut fs = Filesystem::new().unwrap();
        execute(&mut fs, &line("mkdir /a")).unwrap();
        execute(&mut fs, &line("cd /a")).unwrap();
        assert_eq!(fs.current_path(), "/a");
    }

    #[test]
    fn epoch_formatting() {
        assert_eq!(format_time(0), "1970-01-01 00:00:00");
        assert_eq!(format_time(86400 + 3661), "1970-01-02 01:01:01");
    }
}
