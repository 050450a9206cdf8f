use log::{info, warn};

use error::Error;
use filesystem::Filesystem;

mod error;
mod filesystem;
mod shell;
mod structs;

const BACKING_FILE: &str = "filesystem.dat";

fn load_or_create() -> Result<Filesystem, Error> {
    match std::fs::File::open(BACKING_FILE) {
        Ok(mut file) => match Filesystem::load_from(&mut file) {
            Ok(fs) => {
                info!("loaded image from {BACKING_FILE}");
                Ok(fs)
            }
            Err(Error::Corruption) => {
                warn!("{BACKING_FILE} failed validation, starting with a fresh image");
                Filesystem::new()
            }
            Err(e) => Err(e),
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Filesystem::new(),
        Err(e) => Err(e.into()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let mut fs = load_or_create()?;
    loop {
        let Some(args) = shell::prompt(fs.current_path()) else {
            break;
        };
        match shell::execute(&mut fs, &args) {
            Ok(shell::Outcome::Exit) => break,
            Ok(shell::Outcome::Continue) => {}
            Err(e) => println!("Error: {e}"),
        }
    }
    let mut file = std::fs::File::create(BACKING_FILE)?;
    fs.store_to(&mut file)?;
    info!("image stored to {BACKING_FILE}");
    Ok(())
}
