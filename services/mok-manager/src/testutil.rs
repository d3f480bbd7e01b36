//! Scripted doubles for the firmware seams. Each one replays a canned
//! script and records what the code under test showed the operator.

use std::collections::VecDeque;

use mok_api::Error;
use rand_core::RngCore;
use digest::Digest;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::console::Console;
use crate::fileenroll::{FilePicker, ShimLock};
use crate::menu::Platform;

#[derive(Default)]
pub struct ScriptedConsole {
    pub lines: VecDeque<String>,
    pub chars: VecDeque<char>,
    pub answers: VecDeque<bool>,
    pub selections: VecDeque<Option<usize>>,
    pub notices: Vec<String>,
    pub alerts: Vec<Vec<String>>,
    pub prompts: Vec<String>,
}

impl ScriptedConsole {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_lines(mut self, lines: &[&str]) -> Self {
        self.lines.extend(lines.iter().map(|s| s.to_string()));
        self
    }

    pub fn with_chars(mut self, chars: &[char]) -> Self {
        self.chars.extend(chars.iter().copied());
        self
    }

    pub fn with_answers(mut self, answers: &[bool]) -> Self {
        self.answers.extend(answers.iter().copied());
        self
    }

    pub fn with_selections(mut self, selections: &[Option<usize>]) -> Self {
        self.selections.extend(selections.iter().copied());
        self
    }
}

impl Console for ScriptedConsole {
    fn clear(&mut self) {}

    fn notify(&mut self, msg: &str) {
        self.notices.push(msg.to_string());
    }

    fn alert(&mut self, lines: &[String]) {
        self.alerts.push(lines.to_vec());
    }

    fn prompt(&mut self, text: &str) {
        self.prompts.push(text.to_string());
    }

    fn line(&mut self, text: &str) {
        self.prompts.push(text.to_string());
    }

    fn yes_no(&mut self, _prompt: &str) -> bool {
        self.answers.pop_front().unwrap_or(false)
    }

    fn select(&mut self, _title: &str, _items: &[String]) -> Option<usize> {
        self.selections.pop_front().unwrap_or(None)
    }

    fn read_line_hidden(&mut self, max: usize) -> Zeroizing<Vec<u16>> {
        let line = self.lines.pop_front().unwrap_or_default();
        Zeroizing::new(line.encode_utf16().take(max).collect())
    }

    fn read_char_hidden(&mut self) -> Option<char> {
        self.chars.pop_front()
    }
}

/// Replays its word list, wrapping around when the script is shorter than
/// the consumer's appetite.
pub struct ScriptedRng {
    values: Vec<u32>,
    at: usize,
}

impl ScriptedRng {
    pub fn new(values: &[u32]) -> Self {
        assert!(!values.is_empty());
        ScriptedRng { values: values.to_vec(), at: 0 }
    }
}

impl RngCore for ScriptedRng {
    fn next_u32(&mut self) -> u32 {
        let value = self.values[self.at % self.values.len()];
        self.at += 1;
        value
    }

    fn next_u64(&mut self) -> u64 {
        (self.next_u32() as u64) << 32 | self.next_u32() as u64
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let word = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// Hands out canned files; `cancelled()` backs out of every pick.
pub struct ScriptedPicker {
    files: Vec<(String, Vec<u8>)>,
    cancel: bool,
}

impl ScriptedPicker {
    pub fn new(files: &[(&str, &[u8])]) -> Self {
        ScriptedPicker {
            files: files.iter().map(|(n, d)| (n.to_string(), d.to_vec())).collect(),
            cancel: false,
        }
    }

    pub fn cancelled() -> Self {
        ScriptedPicker { files: Vec::new(), cancel: true }
    }
}

impl FilePicker for ScriptedPicker {
    fn pick(&mut self, _console: &mut dyn Console, _headline: &[&str]) -> Option<String> {
        if self.cancel {
            return None;
        }
        self.files.first().map(|(name, _)| name.clone())
    }

    fn read(&mut self, name: &str) -> Result<Vec<u8>, Error> {
        self.files
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data.clone())
            .ok_or_else(|| Error::Storage("no such file".to_string()))
    }
}

/// Digests the whole image; stands in for the firmware's authenticode hash.
pub struct TestShim;

impl ShimLock for TestShim {
    fn pe_sha256(&self, image: &[u8]) -> Result<[u8; 32], Error> {
        Ok(Sha256::digest(image).into())
    }
}

pub struct RecordingPlatform {
    pub resets: u32,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        RecordingPlatform { resets: 0 }
    }
}

impl Platform for RecordingPlatform {
    fn warm_reset(&mut self) {
        self.resets += 1;
    }
}
