use anyhow::{bail, Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use report_aql::{
    expression_to_string, includes_all, parse_aql, tokenize, AqlContext, AqlParserConfig,
    ParseError, SqlCompiler,
};

const HELP: &str = "\
命令:
  :config <file>      从JSON文件加载解析器配置（不带参数时清除）
  :let name()=<json>  设置函数字面量的值，例如 :let now()=1700000000
  :sql [table]        切换SQL输出（默认表名 test_results）
  :tokens             切换token输出
  :help               显示帮助
  :quit               退出
其他输入按AQL解析";

struct Session {
    config: Option<AqlParserConfig>,
    context: AqlContext,
    sql_table: Option<String>,
    show_tokens: bool,
}

impl Session {
    fn new() -> Self {
        Self { config: None, context: AqlContext::new(), sql_table: None, show_tokens: false }
    }

    /// 返回 false 表示退出
    fn handle_command(&mut self, line: &str) -> Result<bool> {
        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((c, a)) => (c, a.trim()),
            None => (line, ""),
        };

        match command {
            ":quit" | ":q" => return Ok(false),
            ":help" => println!("{}", HELP),
            ":config" if arg.is_empty() => {
                self.config = None;
                println!("✓ 已清除解析器配置");
            }
            ":config" => {
                let config = AqlParserConfig::from_json_file(arg)
                    .with_context(|| format!("无法加载配置 {}", arg))?;
                println!("✓ 已加载配置: {:?}", config);
                self.config = Some(config);
            }
            ":let" => {
                let Some((name, json)) = arg.split_once('=') else {
                    bail!("用法: :let name()=<json>");
                };
                let name = name.trim();
                if !name.ends_with("()") {
                    bail!("函数名必须以 () 结尾: {}", name);
                }
                let value: serde_json::Value = serde_json::from_str(json.trim())
                    .with_context(|| format!("无效的JSON值: {}", json.trim()))?;
                println!("✓ {} = {}", name, value);
                self.context.insert(name.to_string(), value);
            }
            ":sql" => {
                if self.sql_table.is_some() && arg.is_empty() {
                    self.sql_table = None;
                    println!("SQL输出: 关闭");
                } else {
                    let table = if arg.is_empty() { "test_results" } else { arg };
                    println!("SQL输出: 开启 (表 {})", table);
                    self.sql_table = Some(table.to_string());
                }
            }
            ":tokens" => {
                self.show_tokens = !self.show_tokens;
                println!("token输出: {}", if self.show_tokens { "开启" } else { "关闭" });
            }
            other => bail!("未知命令 {}，输入 :help 查看帮助", other),
        }
        Ok(true)
    }

    fn evaluate(&self, line: &str) {
        if includes_all(Some(line)) {
            println!("(不过滤：匹配全部结果)");
        }

        if self.show_tokens {
            match tokenize(line) {
                Ok(tokens) => {
                    for token in tokens {
                        println!("  {:>4}  {:?}", token.position(), token.kind);
                    }
                }
                Err(e) => print_error(line, &e),
            }
        }

        let context = (!self.context.is_empty()).then_some(&self.context);
        match parse_aql(line, context, self.config.as_ref()) {
            Ok(result) => {
                match &result.expression {
                    Some(expression) => {
                        println!("规范化: {}", expression_to_string(expression));
                        println!("AST: {:#?}", expression);
                    }
                    None => println!("空查询"),
                }
                if let Some(table) = &self.sql_table {
                    match SqlCompiler::new(table.as_str()).compile(&result) {
                        Ok(compiled) => println!("SQL: {}", compiled.sql),
                        Err(e) => println!("✗ SQL 编译失败: {}", e),
                    }
                }
            }
            Err(e) => print_error(line, &e),
        }
    }
}

/// 在出错位置下方画出提示符
fn print_error(line: &str, error: &ParseError) {
    let column = line
        .get(..error.position())
        .map_or(error.position(), |prefix| prefix.chars().count());
    println!("✗ 解析失败 ({:?}): {}", error.kind, error);
    println!("  {}", line);
    println!("  {}^", " ".repeat(column));
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    println!("--- AQL 交互式解析器 (输入 :help 查看帮助) ---");

    let mut rl = DefaultEditor::new()?;
    let mut session = Session::new();

    loop {
        match rl.readline("aql> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;

                if line.starts_with(':') {
                    match session.handle_command(line) {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(e) => println!("✗ {:#}", e),
                    }
                } else {
                    session.evaluate(line);
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
