//! Hosted implementations of the firmware seams, so the whole flow can be
//! driven on a development machine: variables persist as files in a state
//! directory, the console is stdio, and the "ESP" is any local directory.
//! None of this is reachable from a firmware build.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use mok_api::{Error, MemoryVarStore, VarAttrs, VarStore, Variable};
use digest::Digest;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::console::Console;
use crate::fileenroll::{FilePicker, ShimLock};
use crate::menu::Platform;

/// Line-oriented stdio console. Hidden reads are approximated: the terminal
/// still echoes, which is acceptable for a development harness and nowhere
/// else.
pub struct StdConsole {
    input: io::Stdin,
}

impl StdConsole {
    pub fn new() -> Self {
        StdConsole { input: io::stdin() }
    }

    fn read_raw_line(&mut self) -> String {
        let mut line = String::new();
        if self.input.lock().read_line(&mut line).is_err() {
            return String::new();
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        line
    }

    fn wait_ack(&mut self) {
        print!("[Press Enter]");
        io::stdout().flush().ok();
        let _ = self.read_raw_line();
    }
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for StdConsole {
    fn clear(&mut self) {
        print!("\x1b[2J\x1b[H");
        io::stdout().flush().ok();
    }

    fn notify(&mut self, msg: &str) {
        println!("\n  {}", msg);
        self.wait_ack();
    }

    fn alert(&mut self, lines: &[String]) {
        println!();
        for line in lines {
            println!("  {}", line);
        }
        self.wait_ack();
    }

    fn prompt(&mut self, text: &str) {
        print!("{}", text);
        io::stdout().flush().ok();
    }

    fn line(&mut self, text: &str) {
        println!("{}", text);
    }

    fn yes_no(&mut self, prompt: &str) -> bool {
        loop {
            print!("{} (y/n): ", prompt);
            io::stdout().flush().ok();
            match self.read_raw_line().trim() {
                "y" | "Y" | "yes" => return true,
                "n" | "N" | "no" => return false,
                _ => {}
            }
        }
    }

    fn select(&mut self, title: &str, items: &[String]) -> Option<usize> {
        println!("\n{}", title);
        for (i, item) in items.iter().enumerate() {
            println!("  {:2}. {}", i, item);
        }
        loop {
            print!("choice (empty to go back): ");
            io::stdout().flush().ok();
            let line = self.read_raw_line();
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            match line.parse::<usize>() {
                Ok(choice) if choice < items.len() => return Some(choice),
                _ => println!("enter a number from the list"),
            }
        }
    }

    fn read_line_hidden(&mut self, max: usize) -> Zeroizing<Vec<u16>> {
        let line = Zeroizing::new(self.read_raw_line());
        Zeroizing::new(line.encode_utf16().take(max).collect())
    }

    fn read_char_hidden(&mut self) -> Option<char> {
        self.read_raw_line().chars().next()
    }
}

/// A variable store persisted as one file per variable under a state
/// directory: four bytes of little-endian attributes, then the payload.
pub struct FileBackedStore {
    inner: MemoryVarStore,
    dir: PathBuf,
}

impl FileBackedStore {
    pub fn load(dir: &Path) -> Result<FileBackedStore, Error> {
        let mut inner = MemoryVarStore::new();
        if dir.is_dir() {
            let entries =
                fs::read_dir(dir).map_err(|e| Error::Storage(e.to_string()))?;
            for entry in entries {
                let entry = entry.map_err(|e| Error::Storage(e.to_string()))?;
                if !entry.path().is_file() {
                    continue;
                }
                let name = match entry.file_name().into_string() {
                    Ok(name) => name,
                    Err(_) => continue,
                };
                let raw = fs::read(entry.path()).map_err(|e| Error::Storage(e.to_string()))?;
                if raw.len() < 4 {
                    log::warn!("ignoring malformed variable file {}", name);
                    continue;
                }
                let attrs = VarAttrs(u32::from_le_bytes(raw[..4].try_into().unwrap()));
                inner.insert(&name, attrs, &raw[4..]);
            }
        } else {
            fs::create_dir_all(dir).map_err(|e| Error::Storage(e.to_string()))?;
        }
        log::info!("loaded {} variables from {}", inner.names().count(), dir.display());
        Ok(FileBackedStore { inner, dir: dir.to_path_buf() })
    }

    /// Write the current variable set back, dropping files for variables
    /// that no longer exist.
    pub fn persist(&self) -> Result<(), Error> {
        let live: Vec<String> = self.inner.names().map(|n| n.to_string()).collect();
        for name in &live {
            let var = self.inner.get(name)?.expect("live variable vanished");
            let mut raw = var.attrs.bits().to_le_bytes().to_vec();
            raw.extend_from_slice(&var.data);
            fs::write(self.dir.join(name), raw).map_err(|e| Error::Storage(e.to_string()))?;
        }
        let entries = fs::read_dir(&self.dir).map_err(|e| Error::Storage(e.to_string()))?;
        for entry in entries.flatten() {
            if let Ok(name) = entry.file_name().into_string() {
                if !live.iter().any(|n| n == &name) {
                    fs::remove_file(entry.path()).ok();
                }
            }
        }
        Ok(())
    }
}

impl VarStore for FileBackedStore {
    fn get(&self, name: &str) -> Result<Option<Variable>, Error> {
        self.inner.get(name)
    }

    fn set(&mut self, name: &str, attrs: VarAttrs, data: &[u8]) -> Result<(), Error> {
        self.inner.set(name, attrs, data)
    }

    fn append(&mut self, name: &str, attrs: VarAttrs, data: &[u8]) -> Result<(), Error> {
        self.inner.append(name, attrs, data)
    }

    fn delete(&mut self, name: &str) -> Result<(), Error> {
        self.inner.delete(name)
    }
}

/// Directory browser over a local tree standing in for the ESP.
pub struct StdPicker {
    root: PathBuf,
}

impl StdPicker {
    pub fn new(root: &Path) -> Self {
        StdPicker { root: root.to_path_buf() }
    }
}

impl FilePicker for StdPicker {
    fn pick(&mut self, console: &mut dyn Console, headline: &[&str]) -> Option<String> {
        console.alert(&headline.iter().map(|s| s.to_string()).collect::<Vec<_>>());
        let mut cwd = self.root.clone();
        loop {
            let mut dirs: Vec<String> = Vec::new();
            let mut files: Vec<String> = Vec::new();
            let entries = match fs::read_dir(&cwd) {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!("can't list {}: {}", cwd.display(), e);
                    console.notify("Unable to open directory");
                    return None;
                }
            };
            for entry in entries.flatten() {
                if let Ok(name) = entry.file_name().into_string() {
                    if entry.path().is_dir() {
                        dirs.push(format!("{}/", name));
                    } else {
                        files.push(name);
                    }
                }
            }
            dirs.sort();
            files.sort();

            let mut items = Vec::new();
            if cwd != self.root {
                items.push("../".to_string());
            }
            items.extend(dirs);
            items.extend(files);

            let choice = console.select(&format!("[{}]", cwd.display()), &items)?;
            let picked = &items[choice];
            if picked == "../" {
                cwd.pop();
            } else if let Some(dir) = picked.strip_suffix('/') {
                cwd.push(dir);
            } else {
                return Some(cwd.join(picked).display().to_string());
            }
        }
    }

    fn read(&mut self, name: &str) -> Result<Vec<u8>, Error> {
        fs::read(name).map_err(|e| Error::Storage(e.to_string()))
    }
}

/// Digest stand-in for the shim-lock protocol: checks the DOS magic, then
/// hashes the raw image. The firmware build binds the real protocol, which
/// hashes the PE sections the way the runtime verifier does.
pub struct HostedShimLock;

impl ShimLock for HostedShimLock {
    fn pe_sha256(&self, image: &[u8]) -> Result<[u8; 32], Error> {
        if image.len() < 2 || &image[..2] != b"MZ" {
            return Err(Error::Crypto);
        }
        Ok(Sha256::digest(image).into())
    }
}

/// A reset that can only be logged. Returning lets the session wind down,
/// which is exactly what the controller does when firmware refuses a reset.
pub struct LogPlatform;

impl Platform for LogPlatform {
    fn warm_reset(&mut self) {
        log::info!("warm reset requested");
    }
}
