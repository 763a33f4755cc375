mod common;

use ranbundler_core::AnyEmptyResult;

#[test]
fn filter_prints_platform_text() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = tmp.path().join("App.tsx");
	std::fs::write(&file, common::APP)?;

	common::ranbundler_cmd()
		.arg("filter")
		.arg(&file)
		.arg("--platform")
		.arg("web")
		.assert()
		.success()
		.stdout(
			"import React from 'react';\n\n<EXCLUSIVE OF=\"web\">const mouse = \
			 true;</EXCLUSIVE>\nexport default App;\n",
		);

	Ok(())
}

#[test]
fn filter_strip_markers() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = tmp.path().join("App.tsx");
	std::fs::write(&file, common::APP)?;

	common::ranbundler_cmd()
		.arg("filter")
		.arg(&file)
		.arg("-P")
		.arg("mobile")
		.arg("--strip-markers")
		.assert()
		.success()
		.stdout("import React from 'react';\nconst touch = true;\n\nexport default App;\n");

	Ok(())
}

#[test]
fn filter_diff() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let file = tmp.path().join("App.tsx");
	std::fs::write(&file, common::APP)?;

	common::ranbundler_cmd()
		.arg("filter")
		.arg(&file)
		.arg("--platform")
		.arg("mobile")
		.arg("--diff")
		.assert()
		.success()
		.stdout(predicates::str::contains(
			"-<EXCLUSIVE OF=\"web\">const mouse = true;</EXCLUSIVE>",
		))
		.stdout(predicates::str::contains(" export default App;"))
		.stdout(predicates::str::contains("1 kept, 1 removed"));

	Ok(())
}

#[test]
fn filter_missing_file_fails() {
	common::ranbundler_cmd()
		.arg("filter")
		.arg("does-not-exist.tsx")
		.arg("--platform")
		.arg("web")
		.assert()
		.code(2)
		.stderr(predicates::str::contains("error:"));
}
