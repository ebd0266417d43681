//! Built-in language profiles.
//!
//! Every field of a `[languages.<name>]` table that is left unset resolves to
//! the profile below. The tables are plain data: neutralization entries are
//! `(name, pattern, replacement)` triples and rules mirror
//! [`crate::config::RuleConfig`].

use crate::config::{ImplicitImportConfig, RuleConfig, RuntimeKind};
use crate::rules::Severity;

/// File name the media stub is written to inside every workspace that needs one.
pub const MEDIA_STUB_FILE: &str = "sample_media.wav";

pub(crate) struct BuiltinRule {
    pub name: &'static str,
    pub pattern: &'static str,
    pub expected_present: bool,
    pub severity: Severity,
    pub literal: bool,
    pub when: Option<&'static str>,
    pub description: &'static str,
    pub fix: &'static str,
}

impl BuiltinRule {
    pub fn to_config(&self) -> RuleConfig {
        RuleConfig {
            name: self.name.to_string(),
            pattern: self.pattern.to_string(),
            expected_present: self.expected_present,
            severity: self.severity,
            literal: self.literal,
            when: self.when.map(str::to_string),
            description: Some(self.description.to_string()),
            fix: Some(self.fix.to_string()),
        }
    }
}

pub(crate) struct BuiltinImport {
    pub name: &'static str,
    pub when: &'static str,
    pub unless: Option<&'static str>,
    pub code: &'static str,
}

impl BuiltinImport {
    pub fn to_config(&self) -> ImplicitImportConfig {
        ImplicitImportConfig {
            name: self.name.to_string(),
            when: self.when.to_string(),
            unless: self.unless.map(str::to_string),
            code: self.code.to_string(),
        }
    }
}

pub(crate) struct Profile {
    pub fence_markers: &'static [&'static str],
    pub runtime: RuntimeKind,
    pub command: &'static str,
    pub args: &'static [&'static str],
    pub source_file: &'static str,
    pub import_pattern: Option<&'static str>,
    pub entry_point_markers: &'static [&'static str],
    pub declaration_pattern: Option<&'static str>,
    pub statements_host_declarations: bool,
    pub hoist_imports: bool,
    /// `(header, marker regex)`
    pub header: Option<(&'static str, &'static str)>,
    pub concurrent: &'static [&'static str],
    pub class: &'static [&'static str],
    pub async_: &'static [&'static str],
    pub web: &'static [&'static str],
    pub console: &'static [&'static str],
    pub credential: &'static [&'static str],
    pub media: &'static [&'static str],
    pub sync_template: Option<&'static str>,
    pub async_template: Option<&'static str>,
    pub declarations_template: Option<&'static str>,
    pub failure_template: Option<&'static str>,
    pub neutralize: &'static [(&'static str, &'static str, &'static str)],
    pub implicit_imports: &'static [BuiltinImport],
    pub prologue_pattern: Option<&'static str>,
    pub rules: &'static [BuiltinRule],
}

/// Returns the built-in profile for a canonical language name.
pub(crate) fn builtin_profile(name: &str) -> Option<&'static Profile> {
    match name {
        "python" => Some(&PYTHON),
        "csharp" => Some(&CSHARP),
        "go" => Some(&GO),
        "javascript" => Some(&JAVASCRIPT),
        _ => None,
    }
}

/// Names of all languages with a built-in profile.
pub(crate) const BUILTIN_LANGUAGES: &[&str] = &["python", "csharp", "go", "javascript"];

const MEDIA_EXTENSIONS: &[&str] = &[".wav", ".mp3", ".m4a", ".flac", ".opus"];

const DOTENV_STUB: &str = r#"try:
    from dotenv import load_dotenv
except ImportError:
    def load_dotenv(*args, **kwargs):
        return False"#;

const REQUESTS_STUB: &str = r#"try:
    import requests
except ImportError:
    class requests:
        class _Response:
            status_code = 200
            text = ""

            def json(self):
                return {}

            def raise_for_status(self):
                pass

        @staticmethod
        def get(*args, **kwargs):
            return requests._Response()

        @staticmethod
        def post(*args, **kwargs):
            return requests._Response()"#;

const VERBOSELOGS_STUB: &str = r#"try:
    from deepgram.utils import verboselogs
except ImportError:
    class verboselogs:
        SPAM = 5
        DEBUG = 10
        VERBOSE = 15
        INFO = 20
        NOTICE = 25
        WARNING = 30
        SUCCESS = 35
        ERROR = 40"#;

static PYTHON: Profile = Profile {
    fence_markers: &["python", "py", "python3"],
    runtime: RuntimeKind::Script,
    command: "python3",
    args: &["-u"],
    source_file: "sample.py",
    import_pattern: Some(
        r"(?m)^(?:from[ \t]+\S+[ \t]+import[ \t]*\([^)]*\)[^\n]*|from[ \t]+\S+[ \t]+import[ \t]+.+|import[ \t]+\S.*)$",
    ),
    entry_point_markers: &[
        r#"if __name__ == "__main__""#,
        "if __name__ == '__main__'",
        "asyncio.run(",
    ],
    declaration_pattern: Some(r"(?m)^(?:async[ \t]+def|def|class)[ \t]"),
    statements_host_declarations: true,
    hoist_imports: true,
    header: None,
    concurrent: &[
        "threading.Thread",
        "concurrent.futures",
        "ThreadPoolExecutor",
        "multiprocessing",
    ],
    class: &["class "],
    async_: &["async def", "await ", "asyncio.", "AsyncDeepgramClient"],
    web: &["Flask(", "FastAPI(", "@app.route", "@app.get", "@app.post", "django."],
    console: &["print("],
    credential: &["api_key", "DEEPGRAM_API_KEY", "DEEPGRAM_TOKEN", "YOUR_API_KEY"],
    media: &[
        ".wav",
        ".mp3",
        ".m4a",
        ".flac",
        ".opus",
        "audio_file",
        "transcribe_file",
    ],
    sync_template: Some("{{imports}}\n\n{{body}}\n"),
    async_template: Some(
        "import asyncio as __sample_asyncio\n\
         {{imports}}\n\
         \n\
         \n\
         async def __sample_main():\n    {{body}}\n\
         \n\
         \n\
         __sample_asyncio.run(__sample_main())\n",
    ),
    declarations_template: None,
    failure_template: Some(
        "import sys as __sample_sys\n\
         \n\
         try:\n    {{body}}\n\
         except BaseException as __sample_error:\n\
         \x20   if isinstance(__sample_error, SystemExit) and not __sample_error.code:\n\
         \x20       raise\n\
         \x20   print(\"{{marker}}: %r\" % (__sample_error,))\n\
         \x20   __sample_sys.stdout.flush()\n\
         \x20   raise\n",
    ),
    neutralize: &[
        (
            "interactive_input",
            r"(?m)(^[ \t]*|[=(,\[{:][ \t]*|\breturn[ \t]+)input\([^()\n]*\)",
            r#"${1}"test_input""#,
        ),
        (
            "stdin_read",
            r"\bsys\.stdin\.(?:read|readline)\(\)",
            r#""""#,
        ),
        (
            "infinite_loop",
            r"(?m)^([ \t]*)while[ \t]+True[ \t]*:",
            "${1}for _ in range(1):",
        ),
        (
            "long_sleep",
            r"\btime\.sleep\([ \t]*\d+(?:\.\d+)?[ \t]*\)",
            "time.sleep(0)",
        ),
        (
            "async_sleep",
            r"\basyncio\.sleep\([ \t]*\d+(?:\.\d+)?[ \t]*\)",
            "asyncio.sleep(0)",
        ),
        (
            "forever_wait",
            r"\bawait[ \t]+asyncio\.(?:Event\(\)\.wait\(\)|Future\(\))",
            "await asyncio.sleep(0)",
        ),
        ("run_forever", r"\b\w+\.run_forever\(\)", "None"),
        ("signal_pause", r"\bsignal\.pause\(\)", "None"),
        (
            "start_listening",
            r"(?:\bawait[ \t]+)?\b\w+\.start_listening\(\)",
            "None",
        ),
        (
            "websocket_connect",
            r"(?:\bawait[ \t]+)?\b\w+\.connect\(\)",
            "None",
        ),
        (
            "hosted_audio_double",
            r#""https://dpgr\.am/[^"\n]*""#,
            r#""https://example.com/sample-audio""#,
        ),
        (
            "hosted_audio_single",
            r"'https://dpgr\.am/[^'\n]*'",
            "'https://example.com/sample-audio'",
        ),
        (
            "file_write",
            r#"\bopen\([ \t]*(?:"[^"\n]*"|'[^'\n]*')[ \t]*,[ \t]*(["'])([wax]b?\+?)["']"#,
            r#"open("sample_output.tmp", ${1}${2}${1}"#,
        ),
        (
            "media_path_double",
            r#""[^"\n]*\.(?:wav|mp3|m4a|flac|opus)""#,
            r#""sample_media.wav""#,
        ),
        (
            "media_path_single",
            r"'[^'\n]*\.(?:wav|mp3|m4a|flac|opus)'",
            "'sample_media.wav'",
        ),
    ],
    implicit_imports: &[
        BuiltinImport {
            name: "time",
            when: r"(?m)(?:^|[^.\w])time\.\w+\(",
            unless: Some(r"(?m)^[ \t]*import[ \t][^\n]*\btime\b"),
            code: "import time",
        },
        BuiltinImport {
            name: "os",
            when: r"(?m)(?:^|[^.\w])os\.\w+",
            unless: Some(r"(?m)^[ \t]*import[ \t][^\n]*\bos\b"),
            code: "import os",
        },
        BuiltinImport {
            name: "pathlib",
            when: r"(?m)(?:^|[^.\w])Path\(",
            unless: Some(r"(?m)^[ \t]*from[ \t]+pathlib[ \t]+import[^\n]*\bPath\b"),
            code: "from pathlib import Path",
        },
        BuiltinImport {
            name: "re",
            when: r"(?m)(?:^|[^.\w])re\.\w+\(",
            unless: Some(r"(?m)^[ \t]*import[ \t][^\n]*\bre\b"),
            code: "import re",
        },
        BuiltinImport {
            name: "dotenv",
            when: r"\bload_dotenv\(",
            unless: Some(r"(?m)^[ \t]*from[ \t]+dotenv[ \t]+import"),
            code: DOTENV_STUB,
        },
        BuiltinImport {
            name: "requests",
            when: r"(?m)(?:^|[^.\w])requests\.\w+",
            unless: Some(r"(?m)^[ \t]*import[ \t][^\n]*\brequests\b"),
            code: REQUESTS_STUB,
        },
        BuiltinImport {
            name: "verboselogs",
            when: r"(?m)(?:^|[^.\w])verboselogs\.\w+",
            unless: Some(r"(?m)^[ \t]*from[ \t]+deepgram\.utils[ \t]+import[^\n]*\bverboselogs\b"),
            code: VERBOSELOGS_STUB,
        },
    ],
    prologue_pattern: Some(r"(?m)^from[ \t]+__future__[ \t]+import[^\n]*$"),
    rules: &[
        BuiltinRule {
            name: "outdated_sdk_import",
            pattern: r"from deepgram import Deepgram\b",
            expected_present: false,
            severity: Severity::Blocking,
            literal: false,
            when: None,
            description: "Users will get ImportError: this class no longer exists",
            fix: "Change to: `from deepgram import DeepgramClient`",
        },
        BuiltinRule {
            name: "outdated_constructor",
            pattern: r"\bDeepgram\(",
            expected_present: false,
            severity: Severity::Blocking,
            literal: false,
            when: None,
            description: "Users will get NameError: this class no longer exists",
            fix: "Change to: `DeepgramClient(api_key=...)`",
        },
        BuiltinRule {
            name: "outdated_prerecorded_api",
            pattern: "deepgram.transcription.prerecorded",
            expected_present: false,
            severity: Severity::Blocking,
            literal: true,
            when: None,
            description: "Users will get AttributeError: this API structure changed",
            fix: "Change to: `deepgram.listen.v1.media.transcribe_url(...)`",
        },
        BuiltinRule {
            name: "missing_client_import",
            pattern: r"from deepgram import|import deepgram",
            expected_present: true,
            severity: Severity::Blocking,
            literal: false,
            when: Some(r"\bDeepgramClient\b"),
            description: "Users will get NameError when trying to create the client",
            fix: "Add: `from deepgram import DeepgramClient`",
        },
        BuiltinRule {
            name: "missing_os_import",
            pattern: r"(?m)^import os\b",
            expected_present: true,
            severity: Severity::Blocking,
            literal: false,
            when: Some(r"\bos\.(?:getenv|environ)"),
            description: "Users will get NameError when reading environment variables",
            fix: "Add: `import os`",
        },
        BuiltinRule {
            name: "missing_dotenv_import",
            pattern: "from dotenv import load_dotenv",
            expected_present: true,
            severity: Severity::Improvement,
            literal: true,
            when: Some(r"\bload_dotenv\("),
            description: "Users without python-dotenv will get ImportError",
            fix: "Add: `from dotenv import load_dotenv` (and note it's optional)",
        },
        BuiltinRule {
            name: "async_client_without_await",
            pattern: "await ",
            expected_present: true,
            severity: Severity::Blocking,
            literal: true,
            when: Some(r"\bAsyncDeepgramClient\b"),
            description: "The async client returns coroutines that are never awaited",
            fix: "Show proper await usage with async client methods",
        },
        BuiltinRule {
            name: "missing_api_key",
            pattern: r"api_key|DEEPGRAM_API_KEY|DEEPGRAM_TOKEN",
            expected_present: true,
            severity: Severity::Improvement,
            literal: false,
            when: Some(r"\bDeepgramClient\("),
            description: "The client is constructed without showing where the API key comes from",
            fix: "Pass the key explicitly: `DeepgramClient(api_key=os.getenv('DEEPGRAM_API_KEY'))`",
        },
        BuiltinRule {
            name: "placeholder_api_key",
            pattern: "YOUR_API_KEY",
            expected_present: false,
            severity: Severity::Improvement,
            literal: true,
            when: None,
            description: "Users learn proper API key management from the start",
            fix: "Show the environment variable pattern: `os.getenv('DEEPGRAM_API_KEY')`",
        },
        BuiltinRule {
            name: "placeholder_audio_path",
            pattern: r#"["']path/to/audio\.wav["']"#,
            expected_present: false,
            severity: Severity::Improvement,
            literal: false,
            when: None,
            description: "Users understand how to provide actual file paths",
            fix: "Use a realistic example path or show how to get it from user input",
        },
        BuiltinRule {
            name: "mixed_client_types",
            pattern: r"(?:^|[^c])DeepgramClient",
            expected_present: false,
            severity: Severity::Improvement,
            literal: false,
            when: Some(r"\bAsyncDeepgramClient\b"),
            description: "Showing both clients confuses which one to use",
            fix: "Show either the sync OR the async client, not both",
        },
        BuiltinRule {
            name: "hardcoded_api_url",
            pattern: "https://api.deepgram.com",
            expected_present: false,
            severity: Severity::Improvement,
            literal: true,
            when: None,
            description: "Prevents breakage if the API URL changes",
            fix: "Remove the explicit URL (use the SDK default) or show it as a configuration option",
        },
    ],
};

static CSHARP: Profile = Profile {
    fence_markers: &["csharp", "cs", "c#", "dotnet"],
    runtime: RuntimeKind::Dotnet,
    command: "dotnet",
    args: &["run"],
    source_file: "Program.cs",
    import_pattern: Some(r"(?m)^using[ \t]+[^;(\n]+;"),
    entry_point_markers: &[
        "static void Main",
        "static async Task Main",
        "static int Main",
        "static async Task<int> Main",
    ],
    declaration_pattern: Some(
        r"(?m)^(?:(?:public|internal|private|protected|static|sealed|abstract|partial)[ \t]+)*(?:class|interface|record|struct|enum|namespace)[ \t]",
    ),
    statements_host_declarations: false,
    hoist_imports: true,
    header: None,
    concurrent: &["Task.WhenAll", "Parallel.", "new Thread("],
    class: &["public class", "class "],
    async_: &["await ", "async Task"],
    web: &["Controller", "WebApi", "WebApplication"],
    console: &["Console."],
    credential: &["apiKey", "DEEPGRAM_API_KEY", "DEEPGRAM_TOKEN", "YOUR_API_KEY"],
    media: &[
        ".wav",
        ".mp3",
        ".m4a",
        "audioFile",
        "File.ReadAllBytes",
        "Transcribe.File",
    ],
    sync_template: Some(
        "using System;\n\
         {{imports}}\n\
         \n\
         public static class __SampleProgram\n\
         {\n\
         \x20   public static void Main(string[] args)\n\
         \x20   {\n\
         \x20       try\n\
         \x20       {\n\
         \x20           {{body}}\n\
         \x20       }\n\
         \x20       catch (Exception __sampleError)\n\
         \x20       {\n\
         \x20           Console.WriteLine(\"{{marker}}: \" + __sampleError.Message);\n\
         \x20           Environment.Exit(1);\n\
         \x20       }\n\
         \x20   }\n\
         }\n",
    ),
    async_template: Some(
        "using System;\n\
         {{imports}}\n\
         \n\
         public static class __SampleProgram\n\
         {\n\
         \x20   public static async System.Threading.Tasks.Task Main(string[] args)\n\
         \x20   {\n\
         \x20       try\n\
         \x20       {\n\
         \x20           {{body}}\n\
         \x20       }\n\
         \x20       catch (Exception __sampleError)\n\
         \x20       {\n\
         \x20           Console.WriteLine(\"{{marker}}: \" + __sampleError.Message);\n\
         \x20           Environment.Exit(1);\n\
         \x20       }\n\
         \x20   }\n\
         }\n",
    ),
    declarations_template: Some(
        "using System;\n\
         {{imports}}\n\
         \n\
         {{body}}\n\
         \n\
         public static class __SampleEntry\n\
         {\n\
         \x20   public static void Main(string[] args)\n\
         \x20   {\n\
         \x20   }\n\
         }\n",
    ),
    failure_template: None,
    neutralize: &[
        ("read_line", r"\bConsole\.ReadLine\(\)", r#""test_input""#),
        (
            "read_key",
            r"\bConsole\.ReadKey\([^()\n]*\)",
            "default(ConsoleKeyInfo)",
        ),
        (
            "infinite_loop",
            r"\bwhile[ \t]*\([ \t]*true[ \t]*\)",
            "for (var __sampleIteration = 0; __sampleIteration < 1; __sampleIteration++)",
        ),
        (
            "thread_sleep",
            r"\bThread\.Sleep\((?:[^()\n]|\([^()\n]*\))*\)",
            "Thread.Sleep(0)",
        ),
        (
            "infinite_delay",
            r"\bTask\.Delay\([ \t]*(?:-1|Timeout\.Infinite)[ \t]*\)",
            "Task.Delay(0)",
        ),
        (
            "media_path",
            r#""[^"\n]*\.(?:wav|mp3|m4a|flac|opus)""#,
            r#""sample_media.wav""#,
        ),
    ],
    implicit_imports: &[],
    prologue_pattern: None,
    rules: &[
        BuiltinRule {
            name: "legacy_credentials",
            pattern: "new Credentials(",
            expected_present: false,
            severity: Severity::Blocking,
            literal: true,
            when: None,
            description: "The Credentials type was removed in the current SDK",
            fix: "Create clients with `ClientFactory.CreateListenRESTClient(apiKey)`",
        },
        BuiltinRule {
            name: "missing_deepgram_using",
            pattern: r"(?m)^using[ \t]+Deepgram",
            expected_present: true,
            severity: Severity::Blocking,
            literal: false,
            when: Some(r"\bClientFactory\."),
            description: "Users will get CS0103 because ClientFactory is not in scope",
            fix: "Add: `using Deepgram;`",
        },
        BuiltinRule {
            name: "missing_api_key",
            pattern: r"apiKey|DEEPGRAM_API_KEY|DEEPGRAM_TOKEN",
            expected_present: true,
            severity: Severity::Improvement,
            literal: false,
            when: Some(r"\bClientFactory\.Create\w+\("),
            description: "The client is constructed without showing where the API key comes from",
            fix: "Pass the key explicitly or read it from `DEEPGRAM_API_KEY`",
        },
        BuiltinRule {
            name: "placeholder_api_key",
            pattern: "YOUR_API_KEY",
            expected_present: false,
            severity: Severity::Improvement,
            literal: true,
            when: None,
            description: "Users learn proper API key management from the start",
            fix: "Show `Environment.GetEnvironmentVariable(\"DEEPGRAM_API_KEY\")`",
        },
    ],
};

static GO: Profile = Profile {
    fence_markers: &["go", "golang"],
    runtime: RuntimeKind::Go,
    command: "go",
    args: &["run", "."],
    source_file: "main.go",
    import_pattern: Some(
        r#"(?m)^import[ \t]*\([^)]*\)|^import[ \t]+(?:[\w.]+[ \t]+)?"[^"\n]+""#,
    ),
    entry_point_markers: &["func main()"],
    declaration_pattern: Some(r"(?m)^(?:func|type|var|const)\b"),
    statements_host_declarations: false,
    hoist_imports: true,
    header: Some(("package main", r"(?m)^package[ \t]+\w+")),
    concurrent: &["go func", "goroutine", "sync.WaitGroup", "chan "],
    class: &["struct {", "interface {"],
    async_: &[],
    web: &["http.HandleFunc", "http.ListenAndServe", "gin.Default("],
    console: &["fmt.Print"],
    credential: &["api_key", "apiKey", "DEEPGRAM_API_KEY", "YOUR_API_KEY"],
    media: &[".wav", ".mp3", ".m4a", "audio_file", "FromFile("],
    sync_template: Some(
        "package main\n\
         \n\
         import (\n\
         \t__sampleFmt \"fmt\"\n\
         \t__sampleOs \"os\"\n\
         )\n\
         \n\
         {{imports}}\n\
         \n\
         func main() {\n\
         \tdefer func() {\n\
         \t\tif r := recover(); r != nil {\n\
         \t\t\t__sampleFmt.Println(\"{{marker}}:\", r)\n\
         \t\t\t__sampleOs.Exit(1)\n\
         \t\t}\n\
         \t}()\n\
         \t{{body}}\n\
         }\n",
    ),
    async_template: None,
    declarations_template: Some(
        "package main\n\
         \n\
         {{imports}}\n\
         \n\
         {{body}}\n\
         \n\
         func main() {}\n",
    ),
    failure_template: None,
    neutralize: &[
        ("empty_select", r"\bselect[ \t]*\{[ \t]*\}", "return"),
        (
            "infinite_loop",
            r"(?m)^([ \t]*)for[ \t]*\{",
            "${1}for __sampleIteration := 0; __sampleIteration < 1; __sampleIteration++ {",
        ),
        (
            "long_sleep",
            r"\btime\.Sleep\((?:[^()\n]|\([^()\n]*\))*\)",
            "time.Sleep(0)",
        ),
        (
            "media_path",
            r#""[^"\n]*\.(?:wav|mp3|m4a|flac|opus)""#,
            r#""sample_media.wav""#,
        ),
    ],
    implicit_imports: &[],
    prologue_pattern: None,
    rules: &[
        BuiltinRule {
            name: "legacy_v2_import",
            pattern: "deepgram-go-sdk/v2",
            expected_present: false,
            severity: Severity::Blocking,
            literal: true,
            when: None,
            description: "The v2 module path no longer resolves to the current SDK",
            fix: "Import from `github.com/deepgram/deepgram-go-sdk/v3/pkg/client/...`",
        },
        BuiltinRule {
            name: "legacy_client_constructor",
            pattern: "deepgram.New",
            expected_present: false,
            severity: Severity::Blocking,
            literal: true,
            when: None,
            description: "The package-level constructor was removed",
            fix: "Use the per-API client constructors, e.g. `client.NewWithDefaults()`",
        },
        BuiltinRule {
            name: "placeholder_api_key",
            pattern: "YOUR_API_KEY",
            expected_present: false,
            severity: Severity::Improvement,
            literal: true,
            when: None,
            description: "Users learn proper API key management from the start",
            fix: "Read the key with `os.Getenv(\"DEEPGRAM_API_KEY\")`",
        },
    ],
};

static JAVASCRIPT: Profile = Profile {
    fence_markers: &["javascript", "js", "node", "mjs"],
    runtime: RuntimeKind::Script,
    command: "node",
    args: &[],
    source_file: "sample.mjs",
    import_pattern: Some(r#"(?m)^import[ \t][^\n]*?from[ \t]+["'][^"'\n]+["'];?|^import[ \t]+["'][^"'\n]+["'];?"#),
    entry_point_markers: &[],
    declaration_pattern: None,
    statements_host_declarations: true,
    hoist_imports: false,
    header: None,
    concurrent: &["Promise.all", "new Worker("],
    class: &["class "],
    async_: &["await ", "async "],
    web: &["express(", "app.listen(", "fastify("],
    console: &["console.log("],
    credential: &["apiKey", "DEEPGRAM_API_KEY", "DEEPGRAM_TOKEN", "YOUR_API_KEY"],
    media: MEDIA_EXTENSIONS,
    sync_template: Some("{{body}}\n"),
    async_template: Some("{{body}}\n"),
    declarations_template: None,
    failure_template: Some(
        "const __sampleFail = (error) => {\n\
         \x20 console.log(\"{{marker}}: \" + error);\n\
         \x20 process.exit(1);\n\
         };\n\
         process.on(\"uncaughtException\", __sampleFail);\n\
         process.on(\"unhandledRejection\", __sampleFail);\n\
         \n\
         {{body}}\n",
    ),
    neutralize: &[
        (
            "infinite_loop",
            r"\bwhile[ \t]*\([ \t]*true[ \t]*\)",
            "for (let __sampleIteration = 0; __sampleIteration < 1; __sampleIteration++)",
        ),
        ("interval_timer", r"\bsetInterval\(", "setTimeout("),
        (
            "media_path_double",
            r#""[^"\n]*\.(?:wav|mp3|m4a|flac|opus)""#,
            r#""sample_media.wav""#,
        ),
        (
            "media_path_single",
            r"'[^'\n]*\.(?:wav|mp3|m4a|flac|opus)'",
            "'sample_media.wav'",
        ),
    ],
    implicit_imports: &[],
    prologue_pattern: None,
    rules: &[
        BuiltinRule {
            name: "legacy_constructor",
            pattern: r"\bnew Deepgram\(",
            expected_present: false,
            severity: Severity::Blocking,
            literal: false,
            when: None,
            description: "The Deepgram class was replaced by createClient",
            fix: "Change to: `const deepgram = createClient(apiKey)`",
        },
        BuiltinRule {
            name: "missing_api_key",
            pattern: r"apiKey|DEEPGRAM_API_KEY|DEEPGRAM_TOKEN",
            expected_present: true,
            severity: Severity::Improvement,
            literal: false,
            when: Some(r"\bcreateClient\("),
            description: "The client is constructed without showing where the API key comes from",
            fix: "Pass `process.env.DEEPGRAM_API_KEY` to `createClient`",
        },
        BuiltinRule {
            name: "placeholder_api_key",
            pattern: "YOUR_API_KEY",
            expected_present: false,
            severity: Severity::Improvement,
            literal: true,
            when: None,
            description: "Users learn proper API key management from the start",
            fix: "Show the environment variable pattern: `process.env.DEEPGRAM_API_KEY`",
        },
    ],
};
