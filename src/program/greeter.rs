//! Minimal interactive program: read a name, greet it.

use async_trait::async_trait;

use super::{Program, ProgramIo};
use crate::core::error::Result;

#[derive(Debug, Default)]
pub struct Greeter;

#[async_trait]
impl Program for Greeter {
    fn title(&self) -> &str {
        "Greeter"
    }

    async fn run(&mut self, io: &ProgramIo) -> Result<()> {
        let name = io.input("Name: ").await?;
        io.print(&format!("Hi, {}", name))
    }
}
