use std::path::{Path, PathBuf};

use tokio::process::Command;

/// Builds the command that runs a server artifact.
pub trait Launcher: Send + Sync {
    fn command(&self, artifact: &Path) -> Command;
}

/// `java -Xmx<ram>M -Xms<ram>M -jar <artifact> nogui`
#[derive(Debug, Clone)]
pub struct JavaLauncher {
    java: PathBuf,
    ram_mb: u32,
}

impl JavaLauncher {
    pub fn new(java: impl Into<PathBuf>, ram_mb: u32) -> Self {
        Self {
            java: java.into(),
            ram_mb,
        }
    }
}

impl Launcher for JavaLauncher {
    fn command(&self, artifact: &Path) -> Command {
        let mut command = Command::new(&self.java);
        command
            .arg(format!("-Xmx{}M", self.ram_mb))
            .arg(format!("-Xms{}M", self.ram_mb))
            .arg("-jar")
            .arg(artifact)
            .arg("nogui");
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn java_command_uses_configured_memory() {
        let launcher = JavaLauncher::new("/usr/bin/java", 4096);
        let command = launcher.command(Path::new("minecraft_server.1.2.jar"));
        let command = command.as_std();

        assert_eq!(command.get_program(), "/usr/bin/java");
        let args: Vec<_> = command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "-Xmx4096M",
                "-Xms4096M",
                "-jar",
                "minecraft_server.1.2.jar",
                "nogui"
            ]
        );
    }
}
