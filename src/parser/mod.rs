//! # Region Parser
//!
//! A recursive-descent recognizer for the DS9 region language. Statements
//! are separated by newlines or `;`. Each one is either a setting (`global`,
//! a coordinate system, `tile`, `debug`) or a shape. Shapes run their
//! geometry through the frame's [`CoordMapper`](crate::coords::CoordMapper)
//! and end in a [`RegionSink`](crate::marker::RegionSink) call.
//!
//! A syntax error discards the rest of its statement and parsing resumes
//! with the next one.

mod context;
mod properties;
mod shapes;
mod values;

pub use context::{GlobalState, LocalState, PandaMode, ParseContext};

use crate::config::{OverflowPolicy, ParserConfig};
use crate::error::{Error, Result, SyntaxError};
use crate::lexer::{Lexer, Span, Token, TokenKind};
use crate::marker::{Frame, SinkError};
use crate::style::{Properties, StringLimits};
use std::fmt;
use std::io::Write;
use tracing::{debug, info, trace, warn};

// --- Control Flow ---

/// Why a production stopped early.
pub(crate) enum Halt {
    /// Recoverable at the next statement.
    Syntax(SyntaxError),
    Fatal(Error),
}

impl From<SinkError> for Halt {
    fn from(err: SinkError) -> Self {
        Halt::Fatal(Error::Sink(err))
    }
}

pub(crate) type PResult<T> = std::result::Result<T, Halt>;

/// Counts gathered over one parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseReport {
    /// Non-empty statements that parsed cleanly.
    pub statements: usize,
    /// Syntax errors reported and recovered from.
    pub errors: usize,
}

// --- Parser ---

pub struct Parser<'src, 'f, F: Frame + ?Sized> {
    lexer: Lexer<'src>,
    lookahead: Option<Token<'src>>,
    /// Token kinds tried at the current position, for error messages.
    expected: Vec<TokenKind>,
    frame: &'f mut F,
    ctx: ParseContext,
    config: ParserConfig,
    on_error: Option<Box<dyn FnMut(&SyntaxError) + 'f>>,
    debug_stream: Option<Box<dyn Write + 'f>>,
    report: ParseReport,
}

impl<'src, 'f, F: Frame + ?Sized> Parser<'src, 'f, F> {
    pub fn new(src: &'src str, frame: &'f mut F) -> Self {
        Self::with_config(src, frame, ParserConfig::default())
    }

    pub fn with_config(src: &'src str, frame: &'f mut F, config: ParserConfig) -> Self {
        Parser {
            lexer: Lexer::with_max_string_len(src, config.max_string_len),
            lookahead: None,
            expected: Vec::new(),
            frame,
            ctx: ParseContext::default(),
            config,
            on_error: None,
            debug_stream: None,
            report: ParseReport::default(),
        }
    }

    /// Called once for every syntax error, before recovery.
    pub fn on_error(mut self, callback: impl FnMut(&SyntaxError) + 'f) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    pub fn debug_level(&self) -> u8 {
        self.config.debug_level
    }

    pub fn set_debug_level(&mut self, level: u8) {
        self.config.debug_level = level;
    }

    /// Where the debug trace goes; stderr if never set.
    pub fn set_debug_stream(&mut self, stream: impl Write + 'f) {
        self.debug_stream = Some(Box::new(stream));
    }

    pub fn context(&self) -> &ParseContext {
        &self.ctx
    }

    /// Parses the whole input. `Err` means parsing stopped before the end.
    pub fn parse(&mut self) -> Result<ParseReport> {
        self.ctx.init_global();
        debug!("parsing region text");
        loop {
            match self.command() {
                Ok(true) => break,
                Ok(false) => {}
                Err(Halt::Fatal(err)) => return Err(err),
                Err(Halt::Syntax(err)) => {
                    self.report_error(err)?;
                    if self.skip_statement() {
                        break;
                    }
                    // a failed statement is not a continuation slot
                    self.settle_legacy()?;
                }
            }
        }
        // a pending legacy annulus is committed at end of input
        self.settle_legacy()?;
        debug!(statements = self.report.statements, errors = self.report.errors, "parse finished");
        Ok(self.report)
    }

    /// Commits a pending legacy annulus, or drops a lone shape's claim to
    /// the next statement.
    fn settle_legacy(&mut self) -> Result<()> {
        match self.post_local() {
            Ok(()) => Ok(()),
            Err(Halt::Fatal(err)) => Err(err),
            Err(Halt::Syntax(err)) => self.report_error(err),
        }
    }

    // --- Tokens ---

    fn peek_kind(&mut self) -> TokenKind {
        if let Some(tok) = &self.lookahead {
            return tok.kind;
        }
        let tok = self.lexer.next_token();
        self.trace(format_args!("Reading a token: Next token is {} ({}: {:?})", tok.kind, tok.span, tok.lexeme));
        let kind = tok.kind;
        self.lookahead = Some(tok);
        kind
    }

    fn peek_span(&mut self) -> Span {
        self.peek_kind();
        self.lookahead.as_ref().map(|tok| tok.span).unwrap_or_default()
    }

    fn bump(&mut self) -> Token<'src> {
        self.peek_kind();
        let tok = match self.lookahead.take() {
            Some(tok) => tok,
            None => self.lexer.next_token(),
        };
        self.expected.clear();
        self.trace(format_args!("Shifting token {} ({})", tok.kind, tok.span));
        tok
    }

    fn at(&mut self, kind: TokenKind) -> bool {
        if self.peek_kind() == kind {
            true
        } else {
            self.expected.push(kind);
            false
        }
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token<'src>> {
        if self.at(kind) {
            Some(self.bump())
        } else {
            None
        }
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token<'src>> {
        match self.eat(kind) {
            Some(tok) => Ok(tok),
            None => Err(self.unexpected()),
        }
    }

    fn expect_one_of(&mut self, kinds: &[TokenKind]) -> PResult<Token<'src>> {
        if kinds.contains(&self.peek_kind()) {
            return Ok(self.bump());
        }
        self.expected.extend_from_slice(kinds);
        Err(self.unexpected())
    }

    /// The remainder of the line as one STRING, starting at the lookahead
    /// if one was already read.
    fn rest_of_line(&mut self) -> PResult<Token<'src>> {
        let from = match self.lookahead.take() {
            Some(tok) => tok.span.begin,
            None => self.lexer.location(),
        };
        let tok = self.lexer.rest_of_line(from);
        self.expected.clear();
        if tok.kind == TokenKind::Error {
            return Err(self.invalid(tok.span, format!("syntax error, {}", tok.text())));
        }
        self.trace(format_args!("Discarding rest of line ({}): {:?}", tok.span, tok.text()));
        Ok(tok)
    }

    // --- Diagnostics ---

    fn unexpected(&mut self) -> Halt {
        self.peek_kind();
        let Some(tok) = &self.lookahead else {
            return self.invalid(Span::default(), "syntax error");
        };
        if tok.kind == TokenKind::Error {
            return self.invalid(tok.span, format!("syntax error, {}", tok.text()));
        }

        let mut expected: Vec<TokenKind> = Vec::new();
        for kind in &self.expected {
            if !expected.contains(kind) {
                expected.push(*kind);
            }
        }
        let mut message = format!("syntax error, unexpected {}", tok.kind);
        // more than four alternatives are not worth listing
        if !expected.is_empty() && expected.len() <= 4 {
            let names: Vec<&str> = expected.iter().map(|k| k.name()).collect();
            message.push_str(", expecting ");
            message.push_str(&names.join(" or "));
        }
        self.invalid(tok.span, message)
    }

    fn invalid(&self, span: Span, message: impl Into<String>) -> Halt {
        Halt::Syntax(SyntaxError { span, message: message.into() })
    }

    fn report_error(&mut self, err: SyntaxError) -> Result<()> {
        self.report.errors += 1;
        warn!(location = %err.span, "{}", err.message);
        if let Some(callback) = self.on_error.as_mut() {
            callback(&err);
        }
        if !self.config.recover {
            return Err(Error::Syntax(err));
        }
        if self.report.errors > self.config.max_errors {
            return Err(Error::TooManyErrors { count: self.report.errors });
        }
        Ok(())
    }

    /// Drops tokens through the end of the current statement. Returns true
    /// at end of input.
    fn skip_statement(&mut self) -> bool {
        loop {
            match self.peek_kind() {
                TokenKind::Eol => {
                    self.bump();
                    return false;
                }
                TokenKind::Eof => {
                    self.bump();
                    return true;
                }
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn overflow(&self, span: Span, what: &str, limit: usize) -> PResult<()> {
        match self.config.overflow {
            OverflowPolicy::Drop => {
                warn!(location = %span, limit, "too many {}, extra entries dropped", what);
                Ok(())
            }
            OverflowPolicy::Error => Err(self.invalid(span, format!("too many {} (at most {})", what, limit))),
        }
    }

    fn trace(&mut self, args: fmt::Arguments<'_>) {
        trace!("{}", args);
        if self.config.debug_level == 0 {
            return;
        }
        match self.debug_stream.as_mut() {
            Some(stream) => {
                let _ = writeln!(stream, "{}", args);
            }
            None => eprintln!("{}", args),
        }
    }

    fn reduce(&mut self, rule: &str) {
        self.trace(format_args!("Reducing by rule: {}", rule));
    }

    fn limits(&self) -> StringLimits {
        self.config.string_limits()
    }

    // --- Statements ---

    /// One statement and its terminator. Returns true once end of input is reached.
    fn command(&mut self) -> PResult<bool> {
        self.expected.clear();
        let kind = self.peek_kind();
        if !continues_legacy(kind) {
            self.post_local()?;
        }
        match kind {
            TokenKind::Eol | TokenKind::Eof => {}
            TokenKind::Debug => {
                self.bump();
                let tok = self.expect_one_of(&[TokenKind::On, TokenKind::Off])?;
                self.config.debug_level = u8::from(tok.kind == TokenKind::On);
                self.reduce("command -> DEBUG_ debug");
            }
            TokenKind::Version => {
                self.bump();
                info!("DS9 Regions File 3.1");
                self.reduce("command -> VERSION_");
            }
            TokenKind::Global => {
                self.bump();
                self.global_properties()?;
                self.comment()?;
                self.reduce("command -> GLOBAL_ global comment");
            }
            TokenKind::Tile => {
                self.bump();
                let tok = self.expect(TokenKind::Int)?;
                self.ctx.global.tile = tok.int().unwrap_or(1);
                self.reduce("command -> TILE_ INT");
            }
            TokenKind::Linear => {
                self.bump();
                self.ctx.global.system = self.ctx.global.wcs;
                self.ctx.global.sky = crate::coords::SkyFrame::NativeWcs;
                self.comment()?;
                self.reduce("command -> LINEAR_ comment");
            }
            k if values::COORD_SYSTEMS.contains(&k) => {
                let system = self.coord_system()?;
                self.ctx.global.system = system;
                self.comment()?;
                self.reduce("command -> coordSystem comment");
            }
            k if values::SKY_FRAMES.contains(&k) => {
                let sky = self.sky_frame()?;
                self.ctx.global.system = self.ctx.global.wcs;
                self.ctx.global.sky = sky;
                self.comment()?;
                self.reduce("command -> skyFrame comment");
            }
            TokenKind::Hash => {
                self.init_local()?;
                self.bump();
                self.hash()?;
            }
            TokenKind::Plus | TokenKind::Minus => {
                self.init_local()?;
                self.include();
                self.shape()?;
                self.reduce("command -> initLocal include shape");
            }
            k if shapes::is_shape_start(k) => {
                self.init_local()?;
                self.shape()?;
                self.reduce("command -> initLocal shape");
            }
            k if values::VALUE_START.contains(&k) => self.legacy_continuation()?,
            _ => return Err(self.unexpected()),
        }
        if !matches!(kind, TokenKind::Eol | TokenKind::Eof) {
            self.report.statements += 1;
        }
        self.terminator()
    }

    fn terminator(&mut self) -> PResult<bool> {
        if self.eat(TokenKind::Eol).is_some() {
            return Ok(false);
        }
        if self.eat(TokenKind::Eof).is_some() {
            return Ok(true);
        }
        Err(self.unexpected())
    }

    /// Whatever follows a `#` at the start of a statement: a commented-out
    /// shape DS9 still draws, a tile setting, or free text.
    fn hash(&mut self) -> PResult<()> {
        match self.peek_kind() {
            k if shapes::is_nonshape_start(k) => {
                self.nonshape()?;
                self.reduce("hash -> nonshape");
            }
            TokenKind::Plus | TokenKind::Minus => {
                self.include();
                self.nonshape()?;
                self.reduce("hash -> include nonshape");
            }
            TokenKind::Tile => {
                self.bump();
                let tok = self.expect(TokenKind::Int)?;
                self.ctx.global.tile = tok.int().unwrap_or(1);
                self.reduce("hash -> TILE_ INT");
            }
            _ => {
                self.rest_of_line()?;
                self.reduce("hash -> STRING");
            }
        }
        Ok(())
    }

    fn include(&mut self) {
        let tok = self.bump();
        let on = tok.kind == TokenKind::Plus;
        self.ctx.local.style.props.set(Properties::INCLUDE, on);
    }

    fn init_local(&mut self) -> PResult<()> {
        if !self.ctx.composite_continues {
            self.frame.reset_composite()?;
        }
        self.ctx.init_local();
        Ok(())
    }

    /// Closes a conjunction: commits a pending legacy annulus.
    fn post_local(&mut self) -> PResult<()> {
        if let Some(commit) = self.ctx.legacy.on_conjunction_end() {
            if commit.delete_provisional {
                self.frame.delete_last()?;
            }
            self.frame.create(commit.marker, commit.style)?;
        }
        Ok(())
    }

    /// A bare radius pair continuing the ellipse or box above it.
    fn legacy_continuation(&mut self) -> PResult<()> {
        if !self.ctx.legacy.on_shape_start() {
            return Err(self.unexpected());
        }
        let span = self.peek_span();
        let radius = self.vvalue()?;
        if !self.ctx.legacy.on_continuation(radius) {
            self.overflow(span, "annuli", crate::legacy::MAX_ANNULI)?;
        }
        self.reduce("command -> vvalue");
        self.comment()
    }

    // --- Comments ---

    fn comment(&mut self) -> PResult<()> {
        if self.eat(TokenKind::Hash).is_some() {
            self.rest_of_line()?;
        }
        Ok(())
    }

    fn shape_comment(&mut self) -> PResult<()> {
        if self.eat(TokenKind::Hash).is_some() {
            self.nonshape_comment()
        } else {
            self.post_local()
        }
    }

    /// Optional local properties, then optional free text kept as the
    /// marker's comment.
    fn nonshape_comment(&mut self) -> PResult<()> {
        if properties::is_local_property_start(self.peek_kind()) {
            self.local_properties()?;
        }
        if !matches!(self.peek_kind(), TokenKind::Eol | TokenKind::Eof) {
            let tok = self.rest_of_line()?;
            let limits = self.limits();
            self.ctx.local.style.set_comment(tok.text(), limits);
        }
        self.post_local()
    }
}

/// Statements that leave a lone ellipse or box open for continuation: blank
/// lines, bare radius pairs, and ellipse or box statements, which settle
/// the previous one themselves and may extend it in the `& !ellipse` form.
fn continues_legacy(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::Eol | TokenKind::Eof | TokenKind::Ellipse | TokenKind::Box)
        || values::VALUE_START.contains(&kind)
}

/// Parses `src` against `frame` with default settings.
pub fn parse_regions<F: Frame + ?Sized>(src: &str, frame: &mut F) -> Result<ParseReport> {
    Parser::new(src, frame).parse()
}

/// Parses `src` with `config`, passing every syntax error to `reporter`.
pub fn parse_regions_with<'f, F: Frame + ?Sized>(
    src: &str,
    frame: &'f mut F,
    config: &ParserConfig,
    reporter: impl FnMut(&SyntaxError) + 'f,
) -> Result<ParseReport> {
    Parser::with_config(src, frame, config.clone()).on_error(reporter).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::{Marker, MemoryFrame, SinkEvent};

    fn run(src: &str) -> (MemoryFrame, Vec<SyntaxError>, Result<ParseReport>) {
        let mut frame = MemoryFrame::new();
        let mut errors = Vec::new();
        let result = parse_regions_with(src, &mut frame, &ParserConfig::default(), |e| errors.push(e.clone()));
        (frame, errors, result)
    }

    macro_rules! assert_error_message {
        ($src:expr, $expected:expr) => {
            let (_, errors, result) = run($src);
            assert!(result.is_ok(), "parse should recover for {:?}", $src);
            assert_eq!(errors.len(), 1, "expected one error for {:?}, got {:?}", $src, errors);
            assert_eq!(errors[0].message, $expected, "message mismatch for {:?}", $src);
        };
    }

    #[test]
    fn test_empty_and_comment_only_input() {
        let (frame, errors, result) = run("# Region file format: DS9 version 4.1\n\n;;\n");
        assert!(errors.is_empty());
        assert_eq!(result.unwrap(), ParseReport { statements: 1, errors: 0 });
        // the comment statement still opens a local scope
        assert_eq!(frame.events, vec![SinkEvent::ResetComposite]);
    }

    #[test]
    fn test_error_messages() {
        assert_error_message!("circle(1,2,3) 4\n", "syntax error, unexpected INT");
        assert_error_message!("global width=red\n", "syntax error, unexpected STRING, expecting INT");
        assert_error_message!("debug maybe\n", "syntax error, unexpected STRING, expecting ON_ or OFF_");
        assert_error_message!("1,2\n", "syntax error, unexpected INT");
        assert_error_message!("circle(1,2,'oops\n", "syntax error, unterminated string");
    }

    #[test]
    fn test_recovery_continues_with_next_statement() {
        let (frame, errors, result) = run("circle(1,2\nbogus\ncircle(3,4,5)\n");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].span.begin.line, 1);
        assert_eq!(errors[1].span.begin.line, 2);
        let report = result.unwrap();
        assert_eq!(report.errors, 2);
        assert_eq!(report.statements, 1);
        let live = frame.markers();
        assert_eq!(live.len(), 1);
        assert!(matches!(live[0].0, Marker::Circle { radius, .. } if *radius == 5.0));
    }

    #[test]
    fn test_strict_mode_stops_at_first_error() {
        let mut frame = MemoryFrame::new();
        let config = ParserConfig { recover: false, ..ParserConfig::default() };
        let mut count = 0;
        let result = parse_regions_with("bogus\ncircle(3,4,5)\n", &mut frame, &config, |_| count += 1);
        assert!(matches!(result, Err(Error::Syntax(_))));
        assert_eq!(count, 1);
        assert!(frame.markers().is_empty());
    }

    #[test]
    fn test_error_budget() {
        let mut frame = MemoryFrame::new();
        let config = ParserConfig { max_errors: 2, ..ParserConfig::default() };
        let result = parse_regions_with("a\nb\nc\nd\n", &mut frame, &config, |_| {});
        assert!(matches!(result, Err(Error::TooManyErrors { count: 3 })));
    }

    #[test]
    fn test_debug_trace_goes_to_stream() {
        let mut frame = MemoryFrame::new();
        let mut trace = Vec::new();
        {
            let mut parser = Parser::new("circle(1,2,3)\ndebug off\ncircle(4,5,6)\n", &mut frame);
            parser.set_debug_level(1);
            parser.set_debug_stream(&mut trace);
            parser.parse().unwrap();
            assert_eq!(parser.debug_level(), 0);
        }
        let trace = String::from_utf8(trace).unwrap();
        assert!(trace.contains("Reading a token: Next token is CIRCLE_"));
        assert!(trace.contains("Reducing by rule: shape -> CIRCLE_ bp coord sp value ep conjuction shapeComment"));
        // tracing stops after `debug off`
        assert!(!trace.contains("(3.1"));
    }

    #[test]
    fn test_tile_and_version() {
        let mut frame = MemoryFrame::new();
        let mut parser = Parser::new("version\ntile 4\n# tile 2\n", &mut frame);
        let report = parser.parse().unwrap();
        assert_eq!(report.statements, 3);
        assert_eq!(parser.context().global.tile, 2);
    }

    #[test]
    fn test_sink_failure_is_fatal() {
        struct Failing;
        impl crate::coords::CoordMapper for Failing {
            fn map_to_ref(&self, v: crate::coords::Vector, _: crate::coords::CoordSystem, _: crate::coords::SkyFrame) -> crate::coords::Vector { v }
            fn map_len_to_ref(&self, d: f64, _: crate::coords::CoordSystem, _: crate::coords::SkyFormat) -> f64 { d }
            fn map_angle_to_ref(&self, a: f64, _: crate::coords::CoordSystem, _: crate::coords::SkyFrame) -> f64 { a }
        }
        impl crate::marker::RegionSink for Failing {
            fn create(&mut self, _: Marker, _: crate::marker::MarkerStyle) -> std::result::Result<(), SinkError> {
                Err("frame is read-only".into())
            }
            fn delete_last(&mut self) -> std::result::Result<(), SinkError> {
                Ok(())
            }
        }
        let err = parse_regions("circle(1,2,3)\n", &mut Failing).unwrap_err();
        assert_eq!(err.to_string(), "marker sink failed: frame is read-only");
    }
}
