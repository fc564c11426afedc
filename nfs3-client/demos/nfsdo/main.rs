use nfs3_client::{
    mount::MountClient,
    nfs3::{procs::EntryPlus3, FileType3, ReadDirLimit},
    result,
    rpc::AuthSys,
    rpc::OpaqueAuth,
};

use argh::FromArgs;
use std::error::Error;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// Test NFSv3 client
struct Command {
    /// host name or IP address
    #[argh(option, short = 'h')]
    host: String,

    /// exported path to mount
    #[argh(option, short = 'e')]
    export: String,

    /// uid to send in AUTH_SYS credentials, default is 0
    #[argh(option, default = "0")]
    uid: u32,

    /// gid to send in AUTH_SYS credentials, default is 0
    #[argh(option, default = "0")]
    gid: u32,

    #[argh(subcommand)]
    cmd: Commands,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
enum Commands {
    Lookup(Lookup),
    Mkdir(Mkdir),
    Remove(Remove),
    ReadDir(ReadDir),
    Cat(Cat),
    Put(Put),
}

/// Lookup path and print the resulting FH
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "lookup")]
struct Lookup {
    #[argh(positional)]
    path: String,
}

/// Make a directory
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "mkdir")]
struct Mkdir {
    #[argh(positional)]
    path: String,
}

/// Delete a file or a directory tree
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "remove")]
struct Remove {
    #[argh(positional)]
    path: String,
}

/// List a directory
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "ls")]
struct ReadDir {
    #[argh(positional)]
    path: String,
}

/// Print a file to stdout
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "cat")]
struct Cat {
    #[argh(positional)]
    path: String,
}

/// Copy a local file to the export
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "put")]
struct Put {
    #[argh(positional)]
    local: String,

    #[argh(positional)]
    path: String,
}

fn ls_print_entry(entry: &EntryPlus3) {
    let (c1, mode) = match &entry.name_attributes {
        None => ('?', 0),
        Some(attrs) => {
            let c1 = match attrs.file_type {
                FileType3::Reg => '_',
                FileType3::Dir => 'd',
                FileType3::Blk => 'b',
                FileType3::Chr => 'c',
                FileType3::Lnk => 'l',
                FileType3::Sock => 's',
                FileType3::Fifo => 'p',
            };
            (c1, attrs.mode)
        }
    };

    let mut perms = String::with_capacity(9);
    for (bit, c) in [256, 128, 64, 32, 16, 8, 4, 2, 1]
        .iter()
        .zip("rwxrwxrwx".chars())
    {
        perms.push(if (mode & bit) != 0 { c } else { '-' });
    }

    println!("{}{} {}", c1, perms, entry.name);
}

async fn run(cmd: Command) -> result::Result<()> {
    let mut mount = MountClient::dial(&cmd.host).await?;
    let machine_name = std::env::var("HOSTNAME").unwrap_or_else(|_| "nfsdo".to_string());
    let auth = AuthSys::with_rng(
        &mut rand::thread_rng(),
        machine_name,
        cmd.uid,
        cmd.gid,
        Vec::new(),
    );
    let target = mount.mount(&cmd.export, OpaqueAuth::Sys(auth)).await?;
    println!("mounted {}:{}", cmd.host, target.dir_path());

    let res = match &cmd.cmd {
        Commands::Lookup(lookup) => target.lookup(&lookup.path).await.map(|(attrs, fh)| {
            println!("got fh {:02x?}", fh.data);
            if let Some(attrs) = attrs {
                println!("{:#?}", attrs);
            }
        }),
        Commands::Mkdir(mkdir) => target.mkdir(&mkdir.path, 0o755).await.map(|_| ()),
        Commands::Remove(remove) => target.remove_all(&remove.path).await,
        Commands::ReadDir(readdir) => target
            .read_dir_plus(&readdir.path, ReadDirLimit::All)
            .await
            .map(|entries| entries.iter().for_each(ls_print_entry)),
        Commands::Cat(cat) => cat_file(&target, &cat.path).await,
        Commands::Put(put) => put_file(&target, &put.local, &put.path).await,
    };

    let unmounted = mount.unmount().await;
    target.close().await?;
    mount.close().await?;
    res.and(unmounted)
}

async fn cat_file(target: &nfs3_client::nfs3::Target, path: &str) -> result::Result<()> {
    let mut reader = target.open(path).await?;
    let mut data = Vec::new();
    reader.read_to_end(&mut data).await?;
    tokio::io::stdout().write_all(&data).await?;
    Ok(())
}

async fn put_file(target: &nfs3_client::nfs3::Target, local: &str, path: &str) -> result::Result<()> {
    let data = tokio::fs::read(local).await?;
    let mut writer = target.open_file(path, 0o644).await?;
    writer.write_all(&data).await?;
    writer.close().await?;
    println!("wrote {} bytes", data.len());
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cmd: Command = argh::from_env();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cmd))?;

    Ok(())
}
