// io.rs - PGM image reader/writer running as a single actor task
//
// The control loop never touches the filesystem itself: it sends commands to
// the actor, which serves them strictly in order. That ordering is what makes
// the idle check meaningful, since its reply is only sent once every earlier
// command has been handled.

use std::path::{Path, PathBuf};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::error::{GolError, Result};
use crate::params::Params;

const COMMAND_BUFFER: usize = 16;

pub enum IoCommand {
    Input { name: String, reply: oneshot::Sender<Result<Vec<u8>>> },
    Output { name: String, bytes: Vec<u8> },
    CheckIdle { reply: oneshot::Sender<bool> },
}

/// Cloneable front end of the I/O actor.
#[derive(Clone)]
pub struct IoHandle {
    commands: mpsc::Sender<IoCommand>,
}

impl IoHandle {
    /// Reads `name` from the image directory as `width x height` samples.
    pub async fn read_image(&self, name: &str) -> Result<Vec<u8>> {
        let (reply, response) = oneshot::channel();
        self.send(IoCommand::Input { name: name.to_owned(), reply }).await?;
        response.await.map_err(|_| GolError::ChannelClosed("io reply"))?
    }

    /// Queues a snapshot write. Failures are logged by the actor and do not
    /// come back to the caller.
    pub async fn write_image(&self, name: &str, bytes: Vec<u8>) -> Result<()> {
        self.send(IoCommand::Output { name: name.to_owned(), bytes }).await
    }

    /// Resolves once every previously queued command has been handled.
    pub async fn check_idle(&self) -> Result<bool> {
        let (reply, response) = oneshot::channel();
        self.send(IoCommand::CheckIdle { reply }).await?;
        response.await.map_err(|_| GolError::ChannelClosed("io reply"))
    }

    async fn send(&self, command: IoCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| GolError::ChannelClosed("io command"))
    }
}

struct IoActor {
    width: usize,
    height: usize,
    image_dir: PathBuf,
    out_dir: PathBuf,
}

/// Starts the I/O actor on the current tokio runtime.
pub fn spawn_io(params: &Params) -> IoHandle {
    let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
    let actor = IoActor {
        width: params.image_width,
        height: params.image_height,
        image_dir: params.image_dir.clone(),
        out_dir: params.out_dir.clone(),
    };
    tokio::spawn(actor.run(rx));
    IoHandle { commands }
}

impl IoActor {
    async fn run(self, mut rx: mpsc::Receiver<IoCommand>) {
        while let Some(command) = rx.recv().await {
            match command {
                IoCommand::Input { name, reply } => {
                    let path = self.image_dir.join(format!("{name}.pgm"));
                    debug!(path = %path.display(), "reading image");
                    let _ = reply.send(read_pgm(&path, self.width, self.height).await);
                }
                IoCommand::Output { name, bytes } => {
                    let path = self.out_dir.join(format!("{name}.pgm"));
                    match write_pgm(&path, self.width, self.height, &bytes).await {
                        Ok(()) => info!(path = %path.display(), "snapshot written"),
                        Err(err) => error!(%err, "snapshot write failed"),
                    }
                }
                IoCommand::CheckIdle { reply } => {
                    let _ = reply.send(true);
                }
            }
        }
        debug!("io actor stopped");
    }
}

pub async fn read_pgm(path: &Path, width: usize, height: usize) -> Result<Vec<u8>> {
    let data = tokio::fs::read(path).await.map_err(|source| GolError::Io {
        path: path.to_owned(),
        source,
    })?;
    decode_pgm(&data, width, height)
}

pub async fn write_pgm(path: &Path, width: usize, height: usize, bytes: &[u8]) -> Result<()> {
    let io_err = |source| GolError::Io { path: path.to_owned(), source };
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await.map_err(io_err)?;
    }
    tokio::fs::write(path, encode_pgm(width, height, bytes)?).await.map_err(io_err)
}

/// Binary (`P5`) PGM with a maximum value of 255.
pub fn encode_pgm(width: usize, height: usize, bytes: &[u8]) -> Result<Vec<u8>> {
    if bytes.len() != width * height {
        return Err(GolError::Image(format!(
            "{} samples do not fill a {height}x{width} image",
            bytes.len()
        )));
    }
    let mut out = format!("P5\n{width} {height}\n255\n").into_bytes();
    out.extend_from_slice(bytes);
    Ok(out)
}

/// Parses a `P5` PGM and checks it has the expected dimensions.
pub fn decode_pgm(data: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
    let mut pos = 0;
    let mut fields = [0usize; 3];

    if data.get(..2) != Some(b"P5".as_slice()) {
        return Err(GolError::Image("not a binary PGM (missing P5 magic)".into()));
    }
    pos += 2;

    for field in fields.iter_mut() {
        // Whitespace and `#` comments may separate header fields.
        loop {
            match data.get(pos) {
                Some(b) if b.is_ascii_whitespace() => pos += 1,
                Some(b'#') => {
                    while data.get(pos).is_some_and(|&b| b != b'\n') {
                        pos += 1;
                    }
                }
                _ => break,
            }
        }
        let start = pos;
        while data.get(pos).is_some_and(u8::is_ascii_digit) {
            pos += 1;
        }
        *field = std::str::from_utf8(&data[start..pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| GolError::Image(format!("malformed PGM header at byte {start}")))?;
    }
    // Exactly one whitespace byte separates the header from the raster.
    pos += 1;

    let [w, h, max] = fields;
    if (w, h) != (width, height) {
        return Err(GolError::Image(format!("image is {h}x{w}, expected {height}x{width}")));
    }
    if max != 255 {
        return Err(GolError::Image(format!("unsupported PGM max value {max}")));
    }
    let raster = data
        .get(pos..pos + width * height)
        .ok_or_else(|| GolError::Image("PGM raster is truncated".into()))?;
    Ok(raster.to_vec())
}
