//! # Test Assembly Model / 测试程序集模型
//!
//! The in-memory shape of a loaded test assembly: classes, their test
//! methods, and the asynchronous bodies behind them. Whatever produces
//! these descriptors (a manifest, a registry built in code) stays outside
//! the orchestration core.
//!
//! 已加载测试程序集的内存形态：类、类中的测试方法以及方法背后的异步主体。
//! 生成这些描述符的方式（清单文件或代码构建的注册表）都位于编排核心之外。

use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::core::models::{ArgValue, DataRow, TestFailure, Traits};

/// Which protocol generation the assembly was built against.
/// 程序集所针对的协议代际。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FrameworkVersion {
    /// The synchronous, callback-style generation.
    /// 同步的、基于回调的旧代际。
    Legacy,
    /// The asynchronous generation.
    /// 异步的新代际。
    Native,
}

impl FrameworkVersion {
    pub fn from_major(major: u32) -> Option<Self> {
        match major {
            2 => Some(FrameworkVersion::Legacy),
            3 => Some(FrameworkVersion::Native),
            _ => None,
        }
    }
}

/// Everything a test body sees when it is invoked.
/// 测试主体被调用时可见的全部上下文。
#[derive(Debug, Clone)]
pub struct TestContext {
    pub display_name: String,
    pub arguments: Vec<ArgValue>,
}

impl TestContext {
    pub fn argument(&self, index: usize) -> &ArgValue {
        self.arguments.get(index).unwrap_or(&ArgValue::Missing)
    }
}

/// A cooperatively scheduled test body.
/// 协作式调度的测试主体。
pub type TestBody =
    Arc<dyn Fn(TestContext) -> BoxFuture<'static, Result<(), TestFailure>> + Send + Sync>;

/// Wraps an async closure as a [`TestBody`].
pub fn test_body<F, Fut>(f: F) -> TestBody
where
    F: Fn(TestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TestFailure>> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Fact,
    Theory,
}

/// Metadata for one test method, as supplied by the descriptor provider.
///
/// 由描述符提供者提供的单个测试方法的元数据。
#[derive(Debug, Clone)]
pub struct TestMethodDescriptor {
    pub namespace: Option<String>,
    /// Class name without namespace; nested classes use `Outer+Inner`.
    /// 不含命名空间的类名；嵌套类使用 `Outer+Inner` 形式。
    pub class_name: String,
    pub method_name: String,
    pub kind: MethodKind,
    pub display_name: Option<String>,
    pub parameters: Vec<String>,
    pub data: Vec<DataRow>,
    pub skip: Option<String>,
    pub explicit: bool,
    pub timeout_ms: Option<u64>,
    pub traits: Traits,
    pub cultures: Vec<String>,
}

impl TestMethodDescriptor {
    pub fn fact(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            class_name: class_name.into(),
            method_name: method_name.into(),
            kind: MethodKind::Fact,
            display_name: None,
            parameters: Vec::new(),
            data: Vec::new(),
            skip: None,
            explicit: false,
            timeout_ms: None,
            traits: Traits::new(),
            cultures: Vec::new(),
        }
    }

    pub fn theory<I, S>(class_name: impl Into<String>, method_name: impl Into<String>, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: MethodKind::Theory,
            parameters: parameters.into_iter().map(Into::into).collect(),
            ..Self::fact(class_name, method_name)
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_row(mut self, row: DataRow) -> Self {
        self.data.push(row);
        self
    }

    pub fn with_skip(mut self, reason: impl Into<String>) -> Self {
        self.skip = Some(reason.into());
        self
    }

    pub fn with_explicit(mut self, explicit: bool) -> Self {
        self.explicit = explicit;
        self
    }

    pub fn with_timeout_ms(mut self, millis: u64) -> Self {
        self.timeout_ms = Some(millis);
        self
    }

    pub fn with_trait(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.traits.add(name, value);
        self
    }

    pub fn with_cultures<I, S>(mut self, cultures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cultures = cultures.into_iter().map(Into::into).collect();
        self
    }

    pub fn class_name_with_namespace(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}.{}", self.class_name),
            None => self.class_name.clone(),
        }
    }

    /// `Namespace.Class.Method`, the identity every case of this method derives from.
    pub fn method_id(&self) -> String {
        format!("{}.{}", self.class_name_with_namespace(), self.method_name)
    }

    pub fn base_display_name(&self) -> String {
        self.display_name.clone().unwrap_or_else(|| self.method_id())
    }
}

/// A test method paired with its body.
#[derive(Clone)]
pub struct TestMethod {
    pub descriptor: TestMethodDescriptor,
    pub body: TestBody,
}

impl fmt::Debug for TestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestMethod")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// A loaded test assembly.
/// 已加载的测试程序集。
#[derive(Debug, Clone)]
pub struct TestAssembly {
    pub name: String,
    pub framework: FrameworkVersion,
    methods: Vec<TestMethod>,
}

impl TestAssembly {
    pub fn new(name: impl Into<String>, framework: FrameworkVersion) -> Self {
        Self {
            name: name.into(),
            framework,
            methods: Vec::new(),
        }
    }

    pub fn with_method(mut self, descriptor: TestMethodDescriptor, body: TestBody) -> Self {
        self.add_method(descriptor, body);
        self
    }

    pub fn add_method(&mut self, descriptor: TestMethodDescriptor, body: TestBody) {
        self.methods.push(TestMethod { descriptor, body });
    }

    pub fn methods(&self) -> &[TestMethod] {
        &self.methods
    }

    /// Looks a method up by its fully-qualified class name and method name.
    pub fn find_method(&self, class_with_namespace: &str, method_name: &str) -> Option<&TestMethod> {
        self.methods.iter().find(|m| {
            m.descriptor.method_name == method_name
                && m.descriptor.class_name_with_namespace() == class_with_namespace
        })
    }
}
