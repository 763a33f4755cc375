mod common;

use ranbundler_core::AnyEmptyResult;
use serde_json::Value;

#[test]
fn list_shows_blocks_with_targets() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_project(tmp.path(), common::CONFIG)?;

	common::ranbundler_cmd()
		.arg("list")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("App.tsx"))
		.stdout(predicates::str::contains("2:1      mobile"))
		.stdout(predicates::str::contains("3:1      web"))
		.stdout(predicates::str::contains("components/Touch.jsx"))
		.stdout(predicates::str::contains("3 block(s) in 2 file(s)"));

	Ok(())
}

#[test]
fn list_as_json() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_project(tmp.path(), common::CONFIG)?;
	common::write(
		&tmp.path().join("src/Shared.svelte"),
		"<EXCLUSIVE class=\"x\">always</EXCLUSIVE>",
	)?;

	let output = common::ranbundler_cmd()
		.arg("list")
		.arg("--format")
		.arg("json")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.get_output()
		.stdout
		.clone();

	let json: Value = serde_json::from_slice(&output)?;
	let files = json.as_array().ok_or("expected an array")?;
	assert_eq!(files.len(), 3);
	assert_eq!(files[0]["file"], "App.tsx");
	assert_eq!(files[0]["blocks"][0]["targets"][0], "mobile");
	assert_eq!(files[0]["blocks"][1]["declaration"], " OF=\"web\"");
	assert_eq!(files[1]["file"], "Shared.svelte");
	assert_eq!(files[1]["blocks"][0]["unconditional"], true);

	Ok(())
}

#[test]
fn list_without_blocks() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(&tmp.path().join("ranbundler.toml"), common::CONFIG)?;
	common::write(&tmp.path().join("src/Plain.tsx"), "export const x = 1;\n")?;

	common::ranbundler_cmd()
		.arg("list")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("No directive blocks found."));

	Ok(())
}
