//! # Assembly Manifest Module / 程序集清单模块
//!
//! A TOML description of a test assembly: its framework generation, classes,
//! methods, data rows and scripted bodies. This is the descriptor provider
//! used by the command-line tool and the integration tests.
//!
//! 测试程序集的 TOML 描述：框架代际、类、方法、数据行以及脚本化的测试主体。
//! 这是命令行工具和集成测试所使用的描述符提供者。
//!
//! ```toml
//! name = "Sample.Tests"
//! framework = 3
//!
//! [[class]]
//! namespace = "Sample"
//! name = "MathTests"
//!
//! [[class.method]]
//! name = "Adds"
//! kind = "theory"
//! parameters = ["x"]
//! body = { action = "assert-arg", index = 0, equals = 42 }
//!
//! [[class.method.row]]
//! args = [42]
//! ```

use futures::future::BoxFuture;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::core::{
    assembly::{FrameworkVersion, MethodKind, TestAssembly, TestBody, TestContext, TestMethodDescriptor, test_body},
    culture::current_culture,
    error::LoadError,
    models::{ArgValue, DataRow, SourceInformation, TestFailure},
};
use crate::infra::source_info::MapSourceInformationProvider;

/// The root of a manifest file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssemblyManifest {
    pub name: String,
    /// Major version of the framework the assembly was built against.
    /// 程序集所针对的框架主版本号。
    pub framework: u32,
    #[serde(default, rename = "class")]
    pub classes: Vec<ClassManifest>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassManifest {
    pub namespace: Option<String>,
    pub name: String,
    /// Traits inherited by every method of the class.
    #[serde(default)]
    pub traits: Vec<(String, String)>,
    #[serde(default, rename = "method")]
    pub methods: Vec<MethodManifest>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestKind {
    #[default]
    Fact,
    Theory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodManifest {
    pub name: String,
    #[serde(default)]
    pub kind: ManifestKind,
    pub display_name: Option<String>,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default, rename = "row")]
    pub rows: Vec<DataRow>,
    pub skip: Option<String>,
    #[serde(default)]
    pub explicit: bool,
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub traits: Vec<(String, String)>,
    #[serde(default)]
    pub cultures: Vec<String>,
    pub source: Option<SourceInformation>,
    #[serde(default)]
    pub body: BodyScript,
}

/// What a scripted test body does when invoked.
/// 脚本化测试主体被调用时执行的动作。
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum BodyScript {
    #[default]
    Pass,
    Fail {
        message: String,
    },
    Panic {
        message: String,
    },
    /// Waits, then behaves like `then`.
    /// 先等待，然后按 `then` 的行为执行。
    Sleep {
        ms: u64,
        #[serde(default)]
        then: Box<BodyScript>,
    },
    /// Passes when argument `index` equals `equals`.
    AssertArg {
        index: usize,
        equals: ArgValue,
    },
    /// Passes when the ambient culture is `equals`.
    AssertCulture {
        equals: String,
    },
}

impl BodyScript {
    pub fn into_body(self) -> TestBody {
        let script = Arc::new(self);
        test_body(move |ctx| {
            let script = Arc::clone(&script);
            async move { script.evaluate(&ctx).await }
        })
    }

    fn evaluate<'a>(&'a self, ctx: &'a TestContext) -> BoxFuture<'a, Result<(), TestFailure>> {
        Box::pin(async move {
            match self {
                BodyScript::Pass => Ok(()),
                BodyScript::Fail { message } => Err(TestFailure::assertion(message.clone())),
                BodyScript::Panic { message } => panic!("{message}"),
                BodyScript::Sleep { ms, then } => {
                    tokio::time::sleep(Duration::from_millis(*ms)).await;
                    then.evaluate(ctx).await
                }
                BodyScript::AssertArg { index, equals } => {
                    let actual = ctx.argument(*index);
                    if actual == equals {
                        Ok(())
                    } else {
                        Err(TestFailure::assertion(format!(
                            "Assert.Equal() Failure\nExpected: {}\nActual:   {}",
                            equals.render(),
                            actual.render()
                        )))
                    }
                }
                BodyScript::AssertCulture { equals } => {
                    let actual = current_culture();
                    if &actual == equals {
                        Ok(())
                    } else {
                        Err(TestFailure::assertion(format!(
                            "expected culture '{equals}', running in '{actual}'"
                        )))
                    }
                }
            }
        })
    }
}

impl AssemblyManifest {
    pub fn parse(content: &str, path: &Path) -> Result<Self, LoadError> {
        toml::from_str(content).map_err(|e| LoadError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        if !path.is_file() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, path)
    }

    /// Builds the in-memory assembly plus the source table declared in the manifest.
    ///
    /// 构建内存中的程序集以及清单中声明的源码信息表。
    pub fn into_assembly(self) -> Result<(TestAssembly, MapSourceInformationProvider), LoadError> {
        let framework = FrameworkVersion::from_major(self.framework)
            .ok_or(LoadError::UnsupportedFramework(self.framework))?;
        let mut assembly = TestAssembly::new(self.name, framework);
        let mut sources = MapSourceInformationProvider::new();

        for class in self.classes {
            for method in class.methods {
                let descriptor = method.descriptor(&class.namespace, &class.name, &class.traits);
                if let Some(source) = method.source {
                    sources.insert(
                        descriptor.class_name_with_namespace(),
                        descriptor.method_name.clone(),
                        source,
                    );
                }
                assembly.add_method(descriptor, method.body.into_body());
            }
        }
        Ok((assembly, sources))
    }
}

impl MethodManifest {
    fn descriptor(
        &self,
        namespace: &Option<String>,
        class_name: &str,
        class_traits: &[(String, String)],
    ) -> TestMethodDescriptor {
        let mut descriptor = match self.kind {
            ManifestKind::Fact => TestMethodDescriptor::fact(class_name, &self.name),
            ManifestKind::Theory => TestMethodDescriptor::theory(class_name, &self.name, self.parameters.clone()),
        };
        descriptor.namespace = namespace.clone();
        descriptor.display_name = self.display_name.clone();
        descriptor.skip = self.skip.clone();
        descriptor.explicit = self.explicit;
        descriptor.timeout_ms = self.timeout_ms;
        descriptor.cultures = self.cultures.clone();
        for (name, value) in class_traits.iter().chain(&self.traits) {
            descriptor.traits.add(name.clone(), value.clone());
        }
        if descriptor.kind == MethodKind::Theory {
            descriptor.data = self.rows.clone();
        }
        descriptor
    }
}
