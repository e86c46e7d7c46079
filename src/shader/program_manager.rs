//! GPU Program Cache
//!
//! Deduplicates generated programs by hashing the **final** source with
//! xxh3-128, seeded with the target language. Equivalent passes (same
//! sub-render-states, same parameters) end up sharing one [`GpuProgram`];
//! each pass slot holding it counts as one reference and the program is
//! evicted once the last reference is released.

use std::path::PathBuf;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use xxhash_rust::xxh3::{xxh3_64, xxh3_128_with_seed};

use crate::errors::{Result, ShaderGenError};
use crate::material::Pass;

use super::compiler::{ENTRY_POINT, NagaCompiler, ProgramCompiler, translate_module};
use super::program::{GpuProgramType, ProgramSet};
use super::writer::{ProgramWriter, UniformInfo, writer_for_language};

/// A compiled, generated program.
#[derive(Debug)]
pub struct GpuProgram {
    name: String,
    program_type: GpuProgramType,
    language: String,
    source: String,
    source_hash: u128,
    uniforms: Vec<UniformInfo>,
    module: naga::Module,
}

impl GpuProgram {
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn program_type(&self) -> GpuProgramType {
        self.program_type
    }

    #[inline]
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    #[inline]
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// xxh3-128 of the generated WGSL seeded with the target language.
    /// [`source`](Self::source) is translated from that WGSL for GLSL.
    #[inline]
    #[must_use]
    pub fn source_hash(&self) -> u128 {
        self.source_hash
    }

    #[inline]
    #[must_use]
    pub fn entry_point(&self) -> &'static str {
        ENTRY_POINT
    }

    /// Members of the uniform block, in declaration order.
    #[must_use]
    pub fn uniforms(&self) -> &[UniformInfo] {
        &self.uniforms
    }

    #[must_use]
    pub fn module(&self) -> &naga::Module {
        &self.module
    }
}

struct CachedProgram {
    program: Arc<GpuProgram>,
    ref_count: usize,
}

/// Source text and hash of a program about to be attached.
struct PendingProgram {
    program_type: GpuProgramType,
    source: String,
    uniforms: Vec<UniformInfo>,
    hash: u128,
}

/// Writes, compiles and caches generated programs.
pub struct ProgramManager {
    /// Seeded xxh3-128 of final source → compiled program.
    cache: FxHashMap<u128, CachedProgram>,
    language: String,
    writer: Box<dyn ProgramWriter>,
    compiler: Box<dyn ProgramCompiler>,
    compile_count: usize,
    cache_path: Option<PathBuf>,
    log_source: bool,
}

impl ProgramManager {
    /// Creates a manager for `language` using the naga compiler.
    pub fn new(language: &str) -> Result<Self> {
        Self::with_compiler(language, Box::new(NagaCompiler))
    }

    pub fn with_compiler(language: &str, compiler: Box<dyn ProgramCompiler>) -> Result<Self> {
        let writer = writer_for_language(language)?;
        if !compiler.supports_language(language) {
            return Err(ShaderGenError::UnsupportedLanguage(language.to_string()));
        }
        Ok(Self {
            cache: FxHashMap::default(),
            language: language.to_ascii_lowercase(),
            writer,
            compiler,
            compile_count: 0,
            cache_path: None,
            log_source: false,
        })
    }

    /// Directory generated sources are written to, if any.
    pub fn set_cache_path(&mut self, path: Option<PathBuf>) {
        self.cache_path = path;
    }

    /// Logs every generated source at debug level.
    pub fn set_log_source(&mut self, enabled: bool) {
        self.log_source = enabled;
    }

    #[must_use]
    pub fn target_language(&self) -> &str {
        &self.language
    }

    /// Switches the target language.
    ///
    /// Programs already cached stay valid; new acquisitions use the new writer.
    pub fn set_target_language(&mut self, language: &str) -> Result<()> {
        if !self.compiler.supports_language(language) {
            return Err(ShaderGenError::UnsupportedLanguage(language.to_string()));
        }
        self.writer = writer_for_language(language)?;
        self.language = language.to_ascii_lowercase();
        Ok(())
    }

    /// Writes both programs of `programs`, compiles the ones not cached yet
    /// and attaches them to `pass`.
    ///
    /// Slots already holding the same program are left untouched, so calling
    /// this twice for an unchanged program set neither recompiles nor adds
    /// references. On error the pass is left as it was.
    pub fn acquire_gpu_programs(&mut self, programs: &ProgramSet, pass: &mut Pass) -> Result<()> {
        let pending = [GpuProgramType::Vertex, GpuProgramType::Fragment]
            .into_iter()
            .map(|ty| -> Result<PendingProgram> {
                let written = self.writer.write_source(programs.program(ty))?;
                let hash = xxh3_128_with_seed(written.source.as_bytes(), self.language_seed());
                Ok(PendingProgram {
                    program_type: ty,
                    source: written.source,
                    uniforms: written.uniforms,
                    hash,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // Compile everything missing before touching the pass.
        let mut compiled = Vec::new();
        for program in &pending {
            if self.cache.contains_key(&program.hash)
                || compiled.iter().any(|p: &GpuProgram| p.source_hash == program.hash)
            {
                continue;
            }
            compiled.push(self.compile(program)?);
        }
        for program in compiled {
            self.cache.insert(
                program.source_hash,
                CachedProgram {
                    program: Arc::new(program),
                    ref_count: 0,
                },
            );
        }

        for program in pending {
            let ty = program.program_type;
            if pass
                .gpu_program(ty)
                .is_some_and(|current| current.source_hash() == program.hash)
            {
                log::debug!("{} program already attached, skipping", ty.name());
                continue;
            }

            if let Some(previous) = pass.set_gpu_program(ty, None) {
                self.release(&previous);
            }

            if let Some(entry) = self.cache.get_mut(&program.hash) {
                entry.ref_count += 1;
                log::debug!(
                    "Attached program {} (references: {})",
                    entry.program.name(),
                    entry.ref_count
                );
                pass.set_gpu_program(ty, Some(entry.program.clone()));
            }
        }

        Ok(())
    }

    /// Detaches the programs of `pass`, evicting those no longer referenced.
    pub fn release_gpu_programs(&mut self, pass: &mut Pass) {
        for ty in [GpuProgramType::Vertex, GpuProgramType::Fragment] {
            if let Some(program) = pass.set_gpu_program(ty, None) {
                self.release(&program);
            }
        }
    }

    /// Number of cached programs.
    #[must_use]
    pub fn program_count(&self) -> usize {
        self.cache.len()
    }

    /// References held on the program with the given source hash.
    #[must_use]
    pub fn reference_count(&self, hash: u128) -> usize {
        self.cache.get(&hash).map_or(0, |entry| entry.ref_count)
    }

    /// Number of programs compiled since creation.
    #[must_use]
    pub fn compile_count(&self) -> usize {
        self.compile_count
    }

    /// Evicts programs no pass holds anymore, e.g. after a material was
    /// dropped without releasing its passes. Returns the number evicted.
    pub fn evict_orphaned(&mut self) -> usize {
        let before = self.cache.len();
        self.cache.retain(|_, entry| {
            let alive = Arc::strong_count(&entry.program) > 1;
            if !alive {
                log::debug!("Evicting orphaned program {}", entry.program.name());
            }
            alive
        });
        before - self.cache.len()
    }

    /// Keeps programs generated from the same WGSL apart per target language.
    fn language_seed(&self) -> u64 {
        xxh3_64(self.language.as_bytes())
    }

    fn release(&mut self, program: &GpuProgram) {
        let hash = program.source_hash();
        let Some(entry) = self.cache.get_mut(&hash) else {
            log::warn!("Released unknown program {}", program.name());
            return;
        };

        entry.ref_count = entry.ref_count.saturating_sub(1);
        if entry.ref_count == 0 {
            log::debug!("Evicting program {}", program.name());
            self.cache.remove(&hash);
        }
    }

    fn compile(&mut self, pending: &PendingProgram) -> Result<GpuProgram> {
        let name = format!("{:032x}_{}", pending.hash, pending.program_type.suffix());

        let module = self
            .compiler
            .compile(&name, pending.program_type, &pending.source)?;
        self.compile_count += 1;

        let source = translate_module(&name, pending.program_type, &module, &self.language)?
            .unwrap_or_else(|| pending.source.clone());

        if self.log_source {
            log::debug!("Generated program {name}:\n{source}");
        }
        if let Some(dir) = &self.cache_path {
            std::fs::create_dir_all(dir)?;
            let file = dir.join(format!("{name}.{}", self.language));
            std::fs::write(file, &source)?;
        }

        Ok(GpuProgram {
            name,
            program_type: pending.program_type,
            language: self.language.clone(),
            source,
            source_hash: pending.hash,
            uniforms: pending.uniforms.clone(),
            module,
        })
    }
}

impl std::fmt::Debug for ProgramManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramManager")
            .field("language", &self.language)
            .field("program_count", &self.cache.len())
            .field("compile_count", &self.compile_count)
            .finish_non_exhaustive()
    }
}
