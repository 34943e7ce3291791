use anyhow::Result;
use ftpgate_common::helpers::hash::hash_password;

use super::common::read_password;

pub(crate) async fn command() -> Result<()> {
    let password = read_password("Password to be hashed", false)?;
    let hash = hash_password(password.expose_secret());
    println!("{}", hash);
    Ok(())
}
