//! Stub collaborators shared by the review and batch tests.

use std::collections::VecDeque;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::{ImageFormat, Rgb, RgbImage};

use crate::ai::EditService;
use crate::error::{Error, Result};
use crate::exif::MetadataCopier;
use crate::prompt::{MenuChoice, Prompter};

/// A small solid-color PNG, distinct per `shade`.
pub fn png(shade: u8) -> Vec<u8> {
    encode(shade, ImageFormat::Png)
}

/// A small solid-color JPEG, distinct per `shade`.
pub fn jpeg(shade: u8) -> Vec<u8> {
    encode(shade, ImageFormat::Jpeg)
}

fn encode(shade: u8, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_pixel(6, 4, Rgb([shade, 255 - shade, 40]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditCall {
    pub prompt: String,
    pub image: Vec<u8>,
    pub mime_type: String,
}

#[derive(Debug, Clone)]
pub enum Reply {
    Image(Vec<u8>),
    NoImage,
    Fail(String),
}

/// Edit service that answers from a script and records every request.
///
/// Scripted replies are consumed first; after that every call returns
/// `fallback`. Requests whose image equals `fail_for` always fail.
pub struct StubEditService {
    replies: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    fail_for: Option<Vec<u8>>,
    calls: Mutex<Vec<EditCall>>,
}

impl StubEditService {
    pub fn returning(image: Vec<u8>) -> Self {
        Self::new(Vec::new(), Reply::Image(image))
    }

    pub fn new(replies: Vec<Reply>, fallback: Reply) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback,
            fail_for: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_for(mut self, image: Vec<u8>) -> Self {
        self.fail_for = Some(image);
        self
    }

    pub fn calls(&self) -> Vec<EditCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl EditService for StubEditService {
    fn name(&self) -> &str {
        "Stub"
    }

    async fn request_edit(
        &self,
        prompt: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<Option<Vec<u8>>> {
        self.calls.lock().unwrap().push(EditCall {
            prompt: prompt.to_string(),
            image: image.to_vec(),
            mime_type: mime_type.to_string(),
        });

        if self.fail_for.as_deref() == Some(image) {
            return Err(Error::EditService("HTTP 500: scripted failure".into()));
        }

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match reply {
            Reply::Image(bytes) => Ok(Some(bytes)),
            Reply::NoImage => Ok(None),
            Reply::Fail(msg) => Err(Error::EditService(msg)),
        }
    }
}

/// Operator answers read from a script. Running out is a prompt error.
#[derive(Default)]
pub struct ScriptedPrompter {
    choices: VecDeque<MenuChoice>,
    comments: VecDeque<String>,
    pub asked: usize,
}

impl ScriptedPrompter {
    pub fn new(choices: &[MenuChoice], comments: &[&str]) -> Self {
        Self {
            choices: choices.iter().copied().collect(),
            comments: comments.iter().map(|c| c.to_string()).collect(),
            asked: 0,
        }
    }

    /// Answer `accept` for as many jobs as needed.
    pub fn accept_all() -> Self {
        Self::new(&[MenuChoice::Accept; 16], &[])
    }
}

impl Prompter for ScriptedPrompter {
    fn choose(&mut self, _file_name: &str) -> Result<MenuChoice> {
        self.asked += 1;
        self.choices
            .pop_front()
            .ok_or_else(|| Error::Prompt("script exhausted".into()))
    }

    fn comment(&mut self) -> Result<String> {
        self.comments
            .pop_front()
            .ok_or_else(|| Error::Prompt("no scripted comment".into()))
    }
}

/// Metadata copier that records calls and optionally fails every time.
#[derive(Default)]
pub struct RecordingCopier {
    pub fail: bool,
    pub copies: Vec<(PathBuf, PathBuf)>,
    pub closes: usize,
}

impl RecordingCopier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl MetadataCopier for RecordingCopier {
    fn name(&self) -> &str {
        "recording"
    }

    fn copy_all_metadata(&mut self, source: &Path, destination: &Path) -> Result<()> {
        self.copies
            .push((source.to_path_buf(), destination.to_path_buf()));
        if self.fail {
            Err(Error::MetadataCopy("exiftool: command not found".into()))
        } else {
            Ok(())
        }
    }

    fn close(&mut self) -> Result<()> {
        self.closes += 1;
        Ok(())
    }
}
