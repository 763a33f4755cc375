#![allow(dead_code)]

use std::path::Path;

use assert_cmd::Command;
use insta_cmd::get_cargo_bin;
use ranbundler_core::AnyEmptyResult;

pub const CONFIG: &str = "input = \"src\"\noutput = \"build-target\"\nignore = \
                          [\"node_modules\"]\nplatforms = [\"mobile\", \"web\"]\n";

pub const APP: &str = "import React from 'react';\n<EXCLUSIVE OF=\"mobile\">const touch = \
                       true;</EXCLUSIVE>\n<EXCLUSIVE OF=\"web\">const mouse = \
                       true;</EXCLUSIVE>\nexport default App;\n";

pub fn ranbundler_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("ranbundler"));
	cmd.env("NO_COLOR", "1");
	cmd.env_remove("RUST_LOG");
	cmd
}

pub fn write(path: &Path, content: &str) -> AnyEmptyResult {
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent)?;
	}
	std::fs::write(path, content)?;

	Ok(())
}

/// A project with `src/App.tsx`, a mobile-only component, a static asset and
/// an ignored `node_modules` directory.
pub fn write_sources(root: &Path) -> AnyEmptyResult {
	write(&root.join("src/App.tsx"), APP)?;
	write(
		&root.join("src/components/Touch.jsx"),
		"<EXCLUSIVE OF=\"mobile\">export const Touch = 1;</EXCLUSIVE>",
	)?;
	write(&root.join("src/logo.svg"), "<svg></svg>\n")?;
	write(&root.join("src/node_modules/pkg/index.js"), "module.exports = 1;\n")?;

	Ok(())
}

pub fn write_project(root: &Path, config: &str) -> AnyEmptyResult {
	write(&root.join("ranbundler.toml"), config)?;
	write_sources(root)
}
